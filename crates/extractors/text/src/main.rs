use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: docscribe-extract-text <file-path>");
        eprintln!();
        eprintln!("Reads a UTF-8 text file and outputs JSON: {{\"text\": ...}} or {{\"error\": ...}}.");
        process::exit(1);
    }

    let path = Path::new(&args[1]);
    let (json, code) = match docscribe_extract_text::extract(path) {
        Ok(text) => (serde_json::json!({ "text": text }), 0),
        Err(e) => (serde_json::json!({ "error": e.to_string() }), 1),
    };
    println!("{json:#}");
    process::exit(code);
}
