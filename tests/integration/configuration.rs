//! Tests for analysis configuration and the validation reaction policy.

use diffrefine::analysis::{Analysis, AnalysisConfig, FitMode, MinimizerConfig, MinimizerFactory};
use diffrefine::diagnostics::{reaction, set_reaction, Reaction};

#[test]
fn test_config_from_partial_json() {
    let config = AnalysisConfig::from_json(
        r#"{
            "calculator": "gaussian",
            "fit_mode": "joint",
            "joint": { "normalize_weights": true },
            "minimizer_options": { "max_iterations": 250 }
        }"#,
    )
    .unwrap();

    assert_eq!(config.calculator.as_deref(), Some("gaussian"));
    assert_eq!(config.minimizer, "lm");
    assert_eq!(config.fit_mode, FitMode::Joint);
    assert!(config.joint.normalize_weights);
    assert_eq!(config.minimizer_options.max_iterations, 250);
    assert_eq!(config.minimizer_options.ftol, MinimizerConfig::default().ftol);
}

#[test]
fn test_config_json_round_trip_through_analysis() {
    let config = AnalysisConfig::new()
        .with_fit_mode(FitMode::Joint)
        .with_minimizer_options(MinimizerConfig::new().with_xtol(1e-10));
    let json = config.to_json().unwrap();

    let analysis = Analysis::new(AnalysisConfig::from_json(&json).unwrap());
    assert_eq!(analysis.config(), &config);
    assert!(analysis.calculator().is_none());
}

#[test]
fn test_bad_json_is_an_error() {
    assert!(AnalysisConfig::from_json(r#"{ "fit_mode": "sideways" }"#).is_err());
}

#[cfg(feature = "lm")]
#[test]
fn test_default_minimizer_is_registered() {
    let factory = MinimizerFactory::default();
    assert!(factory.contains("lm"));
    let minimizer = factory.create("lm", &MinimizerConfig::default()).unwrap();
    assert_eq!(minimizer.name(), "lm");
    assert!(MinimizerFactory::empty().create("lm", &MinimizerConfig::default()).is_err());
}

#[test]
fn test_reaction_policy_settings() {
    assert_eq!(Reaction::from_setting(Some("log")), Reaction::Log);
    assert_eq!(Reaction::from_setting(Some(" WARN ")), Reaction::Log);
    assert_eq!(Reaction::from_setting(Some("raise")), Reaction::Raise);
    assert_eq!(Reaction::from_setting(Some("shout")), Reaction::Raise);
    assert_eq!(Reaction::from_setting(None), Reaction::Raise);
}

#[test]
fn test_reaction_policy_is_per_thread() {
    std::thread::spawn(|| {
        set_reaction(Reaction::Log);
        assert_eq!(reaction(), Reaction::Log);
        let previous = set_reaction(Reaction::Raise);
        assert_eq!(previous, Reaction::Log);
        assert_eq!(reaction(), Reaction::Raise);
    })
    .join()
    .unwrap();
}
