use super::parse;
use crate::cli::commands::{default_decrypt_output, distinct_apis, run_unpack, StdoutMode};
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::{Path, PathBuf};
use wxapkg_core::config::WxapkgConfig;
use wxapkg_core::pipeline::AppReport;
use wxapkg_core::scan::{ApiFinding, ScanReport};

#[test]
fn scan_defaults() {
    match parse(&["wxapkg", "scan", "/data/Applet"]) {
        CliCommand::Scan {
            path,
            output,
            threads,
            wxid,
            offline,
            no_clean,
            json,
            apis_only,
        } => {
            assert_eq!(path, PathBuf::from("/data/Applet"));
            assert!(output.is_none());
            assert!(threads.is_none());
            assert!(wxid.is_none());
            assert!(!offline);
            assert!(!no_clean);
            assert!(json.is_none());
            assert!(!apis_only);
        }
        _ => panic!("expected Scan"),
    }
}

#[test]
fn scan_all_flags() {
    match parse(&[
        "wxapkg",
        "scan",
        "pkg.wxapkg",
        "-o",
        "/tmp/out",
        "--threads",
        "8",
        "--wxid",
        "wx0123456789abcdef",
        "--offline",
        "--no-clean",
        "--json",
        "-",
        "--apis-only",
    ]) {
        CliCommand::Scan {
            output,
            threads,
            wxid,
            offline,
            no_clean,
            json,
            apis_only,
            ..
        } => {
            assert_eq!(output, Some(PathBuf::from("/tmp/out")));
            assert_eq!(threads, Some(8));
            assert_eq!(wxid.as_deref(), Some("wx0123456789abcdef"));
            assert!(offline);
            assert!(no_clean);
            assert_eq!(json, Some(PathBuf::from("-")));
            assert!(apis_only);
        }
        _ => panic!("expected Scan"),
    }
}

#[test]
fn scan_requires_path() {
    assert!(Cli::try_parse_from(["wxapkg", "scan"]).is_err());
    assert!(Cli::try_parse_from(["wxapkg", "scan", "x", "--threads", "many"]).is_err());
}

#[test]
fn unpack_with_output_and_wxid() {
    match parse(&[
        "wxapkg",
        "unpack",
        "__APP__.wxapkg",
        "--output",
        "src",
        "--wxid",
        "wxaaaaaaaaaaaaaaaa",
    ]) {
        CliCommand::Unpack {
            path,
            output,
            threads,
            wxid,
        } => {
            assert_eq!(path, PathBuf::from("__APP__.wxapkg"));
            assert_eq!(output, Some(PathBuf::from("src")));
            assert!(threads.is_none());
            assert_eq!(wxid.as_deref(), Some("wxaaaaaaaaaaaaaaaa"));
        }
        _ => panic!("expected Unpack"),
    }
}

#[test]
fn decrypt_overrides() {
    match parse(&[
        "wxapkg",
        "decrypt",
        "enc.wxapkg",
        "--iv",
        "0123456789abcdef",
        "--salt",
        "pepper",
    ]) {
        CliCommand::Decrypt {
            path,
            wxid,
            output,
            iv,
            salt,
        } => {
            assert_eq!(path, PathBuf::from("enc.wxapkg"));
            assert!(wxid.is_none());
            assert!(output.is_none());
            assert_eq!(iv.as_deref(), Some("0123456789abcdef"));
            assert_eq!(salt.as_deref(), Some("pepper"));
        }
        _ => panic!("expected Decrypt"),
    }
}

#[test]
fn decrypt_output_sits_next_to_input() {
    assert_eq!(
        default_decrypt_output(Path::new("/a/wx1/3/__APP__.wxapkg")),
        PathBuf::from("/a/wx1/3/__APP___dec.wxapkg")
    );
    assert_eq!(
        default_decrypt_output(Path::new("sub.wxapkg")),
        PathBuf::from("sub_dec.wxapkg")
    );
}

fn report(app_id: &str, apis: &[&str]) -> AppReport {
    AppReport {
        app_id: app_id.to_string(),
        output_dir: PathBuf::from("/out").join(app_id),
        details: None,
        packages: Vec::new(),
        scan: Some(ScanReport {
            files_scanned: 1,
            apis: apis
                .iter()
                .enumerate()
                .map(|(i, api)| ApiFinding {
                    index: i + 1,
                    file: "app-service.js".to_string(),
                    api: api.to_string(),
                })
                .collect(),
            sensitive: Vec::new(),
            errors: Vec::new(),
        }),
        warnings: Vec::new(),
    }
}

#[test]
fn distinct_apis_keeps_first_occurrence_order() {
    let reports = vec![
        report("wx1", &["/api/b", "/api/a", "/api/b"]),
        report("wx2", &["/api/c", "/api/a"]),
    ];
    assert_eq!(distinct_apis(&reports), vec!["/api/b", "/api/a", "/api/c"]);
    assert!(distinct_apis(&[]).is_empty());
}

#[test]
fn json_on_stdout_is_the_only_stdout_document() {
    let dash = Path::new("-");
    let file = Path::new("report.json");
    assert_eq!(StdoutMode::select(true, Some(dash)), StdoutMode::Json);
    assert_eq!(StdoutMode::select(false, Some(dash)), StdoutMode::Json);
    assert_eq!(StdoutMode::select(true, Some(file)), StdoutMode::ApiList);
    assert_eq!(StdoutMode::select(true, None), StdoutMode::ApiList);
    assert_eq!(StdoutMode::select(false, Some(file)), StdoutMode::Report);
}

#[test]
fn unpack_rejects_path_like_wxid() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let pkg = dir.path().join("pkg.wxapkg");
    for bad in ["", "..", "/tmp"] {
        let err = run_unpack(
            &WxapkgConfig::default(),
            &pkg,
            Some(out.clone()),
            None,
            Some(bad.to_string()),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("invalid app id"), "{err:#}");
    }
    assert!(!out.exists());
}
