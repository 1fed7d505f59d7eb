use std::io::Write;

use clap::Parser;

use super::*;
use crate::enrich::{load_profiles, parse_profiles};

#[test]
fn parses_enrich_command() {
    let cli = Cli::try_parse_from(["scout", "enrich", "--input", "leads.jsonl"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Enrich {
            concurrency: None,
            exhaustive: false,
            ..
        }
    ));
}

#[test]
fn parses_enrich_overrides() {
    let cli = Cli::try_parse_from([
        "scout",
        "enrich",
        "-i",
        "leads.json",
        "--concurrency",
        "8",
        "--exhaustive",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Commands::Enrich {
            input,
            concurrency,
            exhaustive,
        } => {
            assert_eq!(input, PathBuf::from("leads.json"));
            assert_eq!(concurrency, Some(8));
            assert!(exhaustive);
        }
        other @ Commands::Config => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn enrich_requires_input() {
    assert!(Cli::try_parse_from(["scout", "enrich"]).is_err());
}

#[test]
fn help_is_answered_by_the_parser() {
    let err = Cli::try_parse_from(["scout", "--help"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

    let err = Cli::try_parse_from(["scout", "enrich", "--help"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
}

#[test]
fn parses_config_command() {
    let cli = Cli::try_parse_from(["scout", "config"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Config));
}

#[test]
fn json_lines_input_skips_blank_lines() {
    let text = r#"{"platform":"instagram","handle":"jane","bio":"CEO at Acme"}

{"platform":"github","handle":"jdoe","website":"https://acme.com"}
"#;
    let profiles = parse_profiles(text).unwrap();
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].handle, "jane");
    assert_eq!(profiles[1].website.as_deref(), Some("https://acme.com"));
}

#[test]
fn json_array_input_is_accepted() {
    let text = r#" [{"platform":"tiktok","handle":"a"},{"platform":"youtube","handle":"b"}]"#;
    let profiles = parse_profiles(text).unwrap();
    assert_eq!(profiles.len(), 2);
}

#[test]
fn bad_line_reports_its_number() {
    let text = "{\"platform\":\"instagram\",\"handle\":\"a\"}\n{\"handle\":\"b\"}\n";
    let err = parse_profiles(text).unwrap_err();
    assert!(format!("{err:#}").contains("line 2"), "{err:#}");
}

#[test]
fn profiles_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"platform":"linkbio","handle":"jane"}}"#).unwrap();

    let profiles = load_profiles(file.path()).unwrap();

    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].display_name, "");
}

#[test]
fn missing_file_is_an_error() {
    assert!(load_profiles(std::path::Path::new("/nonexistent/leads.jsonl")).is_err());
}
