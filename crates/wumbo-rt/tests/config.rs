use wumbo_rt::config::{env_key, parse_flag};

#[test]
fn env_keys_are_upper_snake_case() {
    assert_eq!(env_key("unparse", "annotate"), "WUMBO_UNPARSE_ANNOTATE");
    assert_eq!(env_key("build", "out_dir"), "WUMBO_BUILD_OUT_DIR");
    assert_eq!(env_key("build", "outDir"), "WUMBO_BUILD_OUT_DIR");
    assert_eq!(env_key("package", "entry-file"), "WUMBO_PACKAGE_ENTRY_FILE");
}

#[test]
fn flags_accept_common_spellings() {
    for raw in ["1", "true", "YES", " on "] {
        assert_eq!(parse_flag(raw), Some(true), "{raw}");
    }
    for raw in ["0", "False", "no", "off"] {
        assert_eq!(parse_flag(raw), Some(false), "{raw}");
    }
    assert_eq!(parse_flag(""), None);
    assert_eq!(parse_flag("maybe"), None);
}
