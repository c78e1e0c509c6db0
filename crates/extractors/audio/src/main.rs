use std::path::{Path, PathBuf};
use std::process;

use docscribe_common::config::TranscriptionSettings;

fn main() {
    docscribe_common::logging::init("docscribe_extract_audio=info", &[]);

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: docscribe-extract-audio <audio-path> [output-txt] [model-path]");
        eprintln!();
        eprintln!("Transcribes an audio file and outputs JSON.");
        eprintln!();
        eprintln!("Supported formats: M4A (AAC), MP3, WAV");
        eprintln!("The transcript is also saved to [output-txt] (default: <audio-path>.txt).");
        process::exit(1);
    }

    let input = Path::new(&args[1]);
    let output = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}.txt", input.display())));
    let mut settings = TranscriptionSettings::default();
    if let Some(model_path) = args.get(3) {
        settings.model_path = PathBuf::from(model_path);
    }

    let model = docscribe_extract_audio::from_settings(&settings);
    let (json, code) = match docscribe_extract_audio::transcribe_audio(input, &output, model.as_ref()) {
        Ok(text) => (serde_json::json!({ "text": text, "output": output }), 0),
        Err(e) => (serde_json::json!({ "error": e.to_string() }), 1),
    };
    println!("{json:#}");
    process::exit(code);
}
