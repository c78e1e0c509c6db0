use std::path::{Path, PathBuf};
use std::process;

use docscribe_common::config::TranscriptionSettings;
use docscribe_extract_archive::{process_zip_file, ArchiveStatus};

fn main() {
    docscribe_common::logging::init("docscribe_extract_archive=info", &[]);

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: docscribe-extract-archive <zip-path> <output-dir> [scratch-dir] [model-path]");
        eprintln!();
        eprintln!("Converts every supported member of a ZIP archive to a timestamped");
        eprintln!("text file in <output-dir> and prints a JSON report.");
        eprintln!();
        eprintln!("Supported members: .txt, .docx, .pdf, .m4a, .mp3, .wav");
        process::exit(1);
    }

    let zip_path = Path::new(&args[1]);
    let output_dir = Path::new(&args[2]);
    let scratch_root = args.get(3).map(PathBuf::from).unwrap_or_else(std::env::temp_dir);
    let mut settings = TranscriptionSettings::default();
    if let Some(model_path) = args.get(4) {
        settings.model_path = PathBuf::from(model_path);
    }
    let model = docscribe_extract_audio::from_settings(&settings);

    let report = process_zip_file(zip_path, output_dir, &scratch_root, model.as_ref());
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing to JSON: {e}");
            process::exit(1);
        }
    }
    if report.status != ArchiveStatus::Processed {
        process::exit(1);
    }
}
