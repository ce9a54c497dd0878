use std::fs;

use figment::{
    providers::{Format, Toml},
    Figment,
};

use mzfragiso_cli::{resolve_engine_params, Command, EngineArgs, MZFragIso};

#[test_log::test]
#[test_log(default_log_filter = "debug")]
fn test_configured_compare() {
    let mut config = Figment::new();
    config = config.merge(Toml::file_exact("tests/data/compare.toml"));
    let driver: MZFragIso = config.extract().unwrap();
    let Command::Compare(args) = &driver.command else {
        panic!("Expected a compare command, got {:?}", driver.command);
    };
    let output_dir = args.output_dir.clone();
    driver.main().unwrap();

    let scores = fs::read_to_string(output_dir.join("scores.tsv")).unwrap();
    assert!(scores.contains("approx_fragment_S"));
    assert!(!scores.contains("spline_fragment"));
    assert!(output_dir.join("summary.json").exists());
}

#[test]
fn test_engine_layers() {
    let params =
        resolve_engine_params(Some("tests/data/engine.toml".as_ref()), &EngineArgs::default())
            .unwrap();
    assert_eq!(params.ppm_tolerance, 15.0);
    assert_eq!(params.strategies.len(), 3);
    assert_eq!(params.lookahead, 7);

    let overrides = EngineArgs {
        ppm_tolerance: Some(5.0),
        ..Default::default()
    };
    let params = resolve_engine_params(Some("tests/data/engine.toml".as_ref()), &overrides).unwrap();
    assert_eq!(params.ppm_tolerance, 5.0);
    assert_eq!(params.strategies.len(), 3);

    assert!(resolve_engine_params(Some("tests/data/missing.toml".as_ref()), &overrides).is_err());
}
