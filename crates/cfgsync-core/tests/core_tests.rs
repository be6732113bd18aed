#[cfg(test)]
mod tests {
    use cfgsync_core::*;

    // ── Provider ───────────────────────────────────────────────

    #[test]
    fn test_provider_parse() {
        assert_eq!("etcd".parse::<Provider>().unwrap(), Provider::Etcd);
        assert!("consul".parse::<Provider>().is_err());
        assert!("ETCD".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_transports() {
        assert_eq!(Provider::Etcd.transports(), &["http", "https"]);
        assert_eq!(Provider::Etcd.to_string(), "etcd");
    }

    // ── Format ─────────────────────────────────────────────────

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_extension("yaml"), Some(Format::Yaml));
        assert_eq!(Format::from_extension("yml"), Some(Format::Yaml));
        assert_eq!(Format::from_extension("json"), Some(Format::Json));
        assert_eq!(Format::from_extension("toml"), Some(Format::Toml));
        assert_eq!(Format::from_extension("ini"), None);
        assert_eq!(Format::from_extension(""), None);
    }

    #[test]
    fn test_search_extensions_all_decode() {
        for ext in Format::SEARCH_EXTENSIONS {
            assert!(Format::from_extension(ext).is_some(), "{ext} has no decoder");
        }
    }

    // ── Errors ─────────────────────────────────────────────────

    #[test]
    fn test_error_display() {
        let e = CfgError::MissingEncoding("/a/b".into());
        assert!(e.to_string().contains("/a/b"));

        let e = CfgError::unreadable("etcd http://h:1 /k.yaml", "connection refused");
        assert_eq!(
            e.to_string(),
            "config source unreadable: etcd http://h:1 /k.yaml: connection refused"
        );
    }

    #[test]
    fn test_startup_classification() {
        assert!(CfgError::UnsupportedProvider("ftp".into()).is_startup());
        assert!(CfgError::decode("yaml", "bad").is_startup());
        assert!(!CfgError::RefreshFailed("timeout".into()).is_startup());
        assert!(!CfgError::Watch("inotify".into()).is_startup());
    }

    #[test]
    fn test_source_kind_serde() {
        let json = serde_json::to_string(&SourceKind::Remote).unwrap();
        assert_eq!(json, "\"remote\"");
    }
}
