mod tests {
    use crate::*;

    #[test]
    fn test_cli_defaults_to_sweep() {
        let args = CliArgs::try_parse_from(["ipcbench"]).expect("should parse");
        assert_eq!(args.profile, "sweep");
        assert_eq!(args.bin_dir, PathBuf::from("."));
        assert!(args.repeats.is_none());
        assert!(!args.dry_run);
        assert!(!args.list);
    }

    #[test]
    fn test_cli_accepts_profile_and_options() {
        let args = CliArgs::try_parse_from([
            "ipcbench",
            "pull",
            "--bin-dir",
            "build/bench",
            "--repeats",
            "3",
            "--summary-json",
            "out.json",
        ])
        .expect("should parse");
        assert_eq!(args.profile, "pull");
        assert_eq!(args.bin_dir, PathBuf::from("build/bench"));
        assert_eq!(args.repeats, Some(3));
        assert_eq!(args.summary_json, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_cli_rejects_zero_repeats() {
        assert!(CliArgs::try_parse_from(["ipcbench", "--repeats", "0"]).is_err());
    }

    #[test]
    fn test_trace_setting_parse() {
        assert_eq!(TraceSetting::parse(""), TraceSetting::Off);
        assert_eq!(TraceSetting::parse(" off "), TraceSetting::Off);
        assert_eq!(TraceSetting::parse("FALSE"), TraceSetting::Off);
        assert_eq!(TraceSetting::parse("1"), TraceSetting::Enabled);
        assert_eq!(TraceSetting::parse("On"), TraceSetting::Enabled);
        assert_eq!(
            TraceSetting::parse("ipcbench_core=debug"),
            TraceSetting::Filter("ipcbench_core=debug".to_string())
        );
    }

    #[test]
    fn test_trace_setting_filter() {
        assert_eq!(TraceSetting::Off.filter(), None);
        assert_eq!(
            TraceSetting::Filter("ipcbench=trace".to_string()).filter().as_deref(),
            Some("ipcbench=trace")
        );
    }

    #[test]
    fn test_summary_json_conflicts_with_dry_run() {
        let err = CliArgs::try_parse_from(["ipcbench", "--dry-run", "--summary-json", "out.json"])
            .expect_err("flags should conflict");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    struct FullWriter;

    impl Write for FullWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_dry_run_fails_when_output_fails() {
        let profile = Profile::pull().with_repeats(1);
        let err = write_dry_run(&profile, Path::new("bin"), FullWriter)
            .expect_err("write failure must surface");
        assert!(format!("{:#}", err).contains("no space left on device"));
    }

    #[test]
    fn test_dry_run_lists_every_trial() {
        let profile = Profile::memcpy().with_repeats(2);
        let mut out = Vec::new();
        write_dry_run(&profile, Path::new("bin"), &mut out).expect("dry run");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.lines().count() as u64, profile.trial_count());
    }

    #[test]
    fn test_custom_profile_shadows_builtin_in_listing() {
        let custom = vec![Profile::sweep().with_repeats(1)];
        let profiles = available_profiles(&custom);
        let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["sweep", "memcpy", "shm", "pull"]);
        assert_eq!(profiles[0].repeats, 1);
    }

    #[test]
    fn test_print_profiles() {
        let mut out = Vec::new();
        print_profiles(&mut out, &[]).expect("print");
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().any(|l| l.starts_with("pull ") && l.ends_with("(400 runs)")));
    }
}
