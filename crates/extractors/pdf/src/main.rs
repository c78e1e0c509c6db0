use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: docscribe-extract-pdf <file-path>");
        eprintln!();
        eprintln!("Extracts text content from a PDF file and outputs JSON.");
        process::exit(1);
    }

    let path = Path::new(&args[1]);
    let (json, code) = match docscribe_extract_pdf::extract(path) {
        Ok(text) => (serde_json::json!({ "text": text }), 0),
        Err(e) => (serde_json::json!({ "error": e.to_string() }), 1),
    };
    println!("{json:#}");
    process::exit(code);
}
