use anyhow::{Context, Result, bail};
use std::{env, path::PathBuf, process};
use words_and_words_config::{Config, OrphanReplies, Settings};
use words_and_words_engine::{
    Document, DocumentStore, Editor, EditorOptions, FileStore, ReplyPolicy,
};

const USAGE: &str = "\
Usage: words-and-words-cli [--store <dir>] <command>

Commands:
  list                          List documents, most recently edited first
  new <title>                   Create an empty document
  import <file.html> <title>    Create a document from saved markup
  export <id> [out-dir]         Write the document as a .docx file
  render <id>                   Print display markup with variables resolved
  outline <id>                  Print the table of contents
  search <id> <term>            Count occurrences of a term
  delete <id>                   Delete a document";

fn editor_options(settings: &Settings) -> EditorOptions {
    EditorOptions {
        reply_policy: match settings.orphan_replies {
            OrphanReplies::Allow => ReplyPolicy::AllowOrphaned,
            OrphanReplies::Reject => ReplyPolicy::RejectOrphaned,
        },
        always_show_collapse_toggle: settings.always_show_collapse_toggle,
    }
}

/// `--store <dir>` wins over the config file, which wins over the default.
fn resolve_store(args: &mut Vec<String>) -> Result<(PathBuf, Settings)> {
    let config = Config::load().with_context(|| {
        format!(
            "Failed to load config file {}",
            Config::config_path().display()
        )
    })?;
    let settings = config.as_ref().map(|c| c.settings.clone()).unwrap_or_default();

    if let Some(flag) = args.iter().position(|a| a == "--store") {
        if flag + 1 >= args.len() {
            bail!("--store needs a directory");
        }
        let dir = args.remove(flag + 1);
        args.remove(flag);
        return Ok((PathBuf::from(dir), settings));
    }

    let path = match config {
        Some(config) => config.storage_path,
        None => Config::default_storage_path(),
    };
    Ok((path, settings))
}

fn open(store: &FileStore, id: &str, settings: &Settings) -> Result<Editor> {
    let doc = store
        .get(id)?
        .with_context(|| format!("No document with id {id}"))?;
    Ok(Editor::open(&doc, editor_options(settings)))
}

fn print_document(doc: &Document) {
    println!("{}\t{}", doc.id, doc.title);
}

fn run(mut args: Vec<String>) -> Result<()> {
    let (store_path, settings) = resolve_store(&mut args)?;
    log::info!("Document store: {}", store_path.display());
    let mut store = FileStore::new(&store_path);

    let words: Vec<&str> = args.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["list"] => {
            for meta in store.list()? {
                println!(
                    "{}\t{}\t{}",
                    meta.id,
                    meta.updated_at.format("%Y-%m-%d %H:%M"),
                    meta.title
                );
            }
        }
        ["new", title] => {
            let doc = store.create(title, None)?;
            print_document(&doc);
        }
        ["import", file, title] => {
            let markup = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {file}"))?;
            let doc = store.create(title, Some(&markup))?;
            print_document(&doc);
        }
        ["export", id, rest @ ..] if rest.len() <= 1 => {
            let editor = open(&store, id, &settings)?;
            let out_dir = rest.first().map_or_else(|| PathBuf::from("."), PathBuf::from);
            let path = editor.export()?.write_to(&out_dir)?;
            println!("{}", path.display());
        }
        ["render", id] => {
            let editor = open(&store, id, &settings)?;
            println!("{}", editor.render_view());
            if settings.show_counter {
                eprintln!(
                    "{}",
                    settings
                        .counter
                        .label(editor.word_count(), editor.char_count())
                );
            }
        }
        ["outline", id] => {
            let editor = open(&store, id, &settings)?;
            for entry in editor.outline().entries {
                let indent = "  ".repeat(usize::from(entry.level.saturating_sub(1)));
                println!("{indent}{}", entry.text);
            }
        }
        ["search", id, term] => {
            let mut editor = open(&store, id, &settings)?;
            editor.set_search_term(term, false);
            println!("{} matches", editor.search().matches().len());
        }
        ["delete", id] => {
            store.delete(id)?;
        }
        _ => bail!("{USAGE}"),
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
