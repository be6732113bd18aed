#[cfg(test)]
mod tests {
    use cfgsync_cli::Cli;
    use clap::Parser;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["cfgsync", "show"]).unwrap();
        let options = cli.init_options();
        assert_eq!(options.env_prefix, "CFGSYNC");
        assert_eq!(options.cfg_name, "config");
        assert!(options.locator.is_none());
        assert!(!options.force_remote);
        assert!(!options.watch);
        assert_eq!(options.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_remote_flags() {
        let cli = Cli::try_parse_from([
            "cfgsync",
            "--config",
            "etcd+http://127.0.0.1:2380/app/config.yaml",
            "--isRemoteConfig",
            "--poll-interval",
            "10",
            "watch",
        ])
        .unwrap();
        let options = cli.init_options();
        assert_eq!(
            options.locator.as_deref(),
            Some("etcd+http://127.0.0.1:2380/app/config.yaml")
        );
        assert!(options.force_remote);
        assert!(options.watch);
        assert_eq!(options.poll_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_remote_flag_accepts_explicit_bool() {
        let parse = |flag: &str| {
            let cli = Cli::try_parse_from(["cfgsync", flag, "--config", "etcd+http://h/k.yaml", "resolve"])
                .unwrap();
            cli.init_options().force_remote
        };
        assert!(parse("--isRemoteConfig"));
        assert!(parse("--isRemoteConfig=true"));
        assert!(!parse("--isRemoteConfig=false"));

        // Without `=` the next word is not taken as the flag's value.
        let cli = Cli::try_parse_from(["cfgsync", "--isRemoteConfig", "resolve"]).unwrap();
        assert!(cli.init_options().force_remote);
    }

    #[test]
    fn test_set_overrides_are_typed() {
        let cli = Cli::try_parse_from([
            "cfgsync",
            "--set",
            "a=4",
            "--set",
            "server.host=example.org",
            "--set",
            "debug=true",
            "get",
            "a",
        ])
        .unwrap();
        let options = cli.init_options();
        assert_eq!(
            options.overrides,
            vec![
                ("a".to_string(), json!(4)),
                ("server.host".to_string(), json!("example.org")),
                ("debug".to_string(), json!(true)),
            ]
        );
    }

    #[test]
    fn test_set_requires_equals() {
        assert!(Cli::try_parse_from(["cfgsync", "--set", "novalue", "show"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["cfgsync", "-v", "-q", "show"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cfgsync", "get", "server.port", "--env-prefix", "APP"]).unwrap();
        assert_eq!(cli.init_options().env_prefix, "APP");
    }
}
