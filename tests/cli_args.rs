use clap::Parser;
use lab_ingest::{
    cli::{Args, Command},
    template::TemplateVariant,
};
use std::path::PathBuf;

#[test]
fn folder_runs_the_batch() {
    let args = Args::try_parse_from(["lab-ingest", "--dry-run", "/data/scans"]).unwrap();
    assert!(args.cmd.is_none());
    assert!(args.dry_run);
    assert_eq!(args.folder, Some(PathBuf::from("/data/scans")));
}

#[test]
fn extra_positional_is_rejected() {
    assert!(Args::try_parse_from(["lab-ingest", "a", "b"]).is_err());
}

#[test]
fn config_flag_combines_with_subcommands() {
    let args =
        Args::try_parse_from(["lab-ingest", "--config", "c.toml", "classify", "x.pdf"]).unwrap();
    assert_eq!(args.config, Some(PathBuf::from("c.toml")));
    assert!(matches!(args.cmd, Some(Command::Classify { .. })));

    let args = Args::try_parse_from(["lab-ingest", "doctor", "--log-level", "debug"]).unwrap();
    assert_eq!(args.log_level.as_deref(), Some("debug"));
}

#[test]
fn no_arguments_parse_but_carry_nothing() {
    let args = Args::try_parse_from(["lab-ingest"]).unwrap();
    assert!(args.cmd.is_none() && args.folder.is_none());
}

#[test]
fn subcommands_take_files_and_templates() {
    let args = Args::try_parse_from(["lab-ingest", "extract", "x.pdf", "--template", "medlab"])
        .unwrap();
    match args.cmd {
        Some(Command::Extract { file, template }) => {
            assert_eq!(file, PathBuf::from("x.pdf"));
            assert_eq!(template, Some(TemplateVariant::MedLab));
        }
        other => panic!("unexpected {other:?}"),
    }

    let args = Args::try_parse_from([
        "lab-ingest",
        "overlay",
        "x.pdf",
        "--template",
        "cc",
        "--out",
        "x.png",
    ])
    .unwrap();
    assert!(matches!(
        args.cmd,
        Some(Command::Overlay {
            template: TemplateVariant::Cc,
            ..
        })
    ));

    assert!(Args::try_parse_from(["lab-ingest", "regions", "--template", "xyz"]).is_err());
}
