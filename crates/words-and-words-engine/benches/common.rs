// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markup(sections: usize) -> String {
    let mut markup = String::from(r#"<div data-type="title" class="document-title">Report</div>"#);
    for section in 0..sections {
        markup.push_str(&format!("<h1>Section {section}</h1>"));
        markup.push_str(
            r#"<p>Some <strong>bold</strong> prose about the <span data-variable-id="var_client" class="variable-node"></span> account.</p>"#,
        );
        markup.push_str(&format!(
            r#"<p>A <span data-comment-id="comment_{section}" class="comment-highlight">reviewed</span> sentence with more words to search through.</p>"#
        ));
        markup.push_str("<h2>Details</h2><ul><li><p>First point</p></li><li><p>Second point</p></li></ul>");
    }
    markup
}
