#[cfg(test)]
mod tests {
    use crate::config::{Manifest, PoolConfig};
    use crate::error::{Transition, UnitError};
    use crate::infrastructure::{UnitFactory, WorkUnit};
    use crate::infrastructure_in_memory::{ConfiguredFactory, UnitSpec};
    use crate::types::{Composition, Exit, Logic, Sequencing, TypeName, UnitKey};

    #[test]
    fn test_factory_creates_by_name() {
        let factory = ConfiguredFactory::new(vec![UnitSpec::leaf("Tracker").with_cardinality(3)]);

        let unit = factory.create(&TypeName::parse("Tracker")).unwrap();
        assert_eq!(unit.name(), "Tracker");
        assert_eq!(unit.type_name(), "Tracker");
        assert_eq!(unit.cardinality(), 3);
        assert!(unit.is_clonable());
        assert!(!unit.is_reentrant());
        assert_eq!(factory.created("Tracker"), 1);
    }

    #[test]
    fn test_factory_rejects_unknown_name_and_wrong_type() {
        let factory = ConfiguredFactory::new(vec![UnitSpec::leaf("Fit").with_type("KalmanFit")]);

        assert_eq!(
            factory.create(&TypeName::parse("Missing")).err(),
            Some(UnitError::UnknownType {
                type_name: "Missing".to_string(),
                name: "Missing".to_string(),
            })
        );
        assert!(factory.create(&TypeName::parse("Fit")).is_err());
        assert!(factory.create(&TypeName::parse("KalmanFit/Fit")).is_ok());
        assert_eq!(factory.created("Fit"), 1);
    }

    #[test]
    fn test_probe_counts_lifecycle_calls() {
        let factory = ConfiguredFactory::new(vec![UnitSpec::leaf("Alg")]);
        let mut unit = factory.create(&TypeName::parse("Alg")).unwrap();
        unit.set_clone_index(2);

        unit.initialize().unwrap();
        unit.start().unwrap();
        unit.execute().unwrap();
        unit.execute().unwrap();
        unit.stop().unwrap();

        let probe = &factory.probes("Alg")[0];
        assert_eq!(probe.count(Transition::Initialize), 1);
        assert_eq!(probe.count(Transition::Execute), 2);
        assert_eq!(probe.count(Transition::BeginRun), 0);
        assert_eq!(unit.clone_index(), 2);
    }

    #[test]
    fn test_injected_failures() {
        let factory = ConfiguredFactory::new(vec![
            UnitSpec::leaf("Bad").failing_on(Transition::EndRun),
            UnitSpec::leaf("Clones").failing_clones_from(1),
        ]);

        let bad = factory.create(&TypeName::parse("Bad")).unwrap();
        assert!(bad.begin_run().is_ok());
        match bad.end_run() {
            Err(UnitError::Transition {
                name, transition, ..
            }) => {
                assert_eq!(name, "Bad");
                assert_eq!(transition, Transition::EndRun);
            }
            other => panic!("Expected Transition error, got {:?}", other),
        }

        let primary = factory.create(&TypeName::parse("Clones")).unwrap();
        assert!(primary.initialize().is_ok());
        let mut clone = factory.create(&TypeName::parse("Clones")).unwrap();
        clone.set_clone_index(1);
        assert!(clone.initialize().is_err());
    }

    #[test]
    fn test_type_name_parsing() {
        assert_eq!(TypeName::parse("Gen/Alg1"), TypeName::new("Gen", "Alg1"));
        assert_eq!(TypeName::parse("Alg1"), TypeName::new("Alg1", "Alg1"));
        assert_eq!(TypeName::new("Gen", "Alg1").to_string(), "Gen/Alg1");
        assert_eq!(TypeName::new("Alg1", "Alg1").to_string(), "Alg1");
    }

    #[test]
    fn test_unit_key_follows_name() {
        assert_eq!(UnitKey::of("Alg1"), UnitKey::of("Alg1"));
        assert_ne!(UnitKey::of("Alg1"), UnitKey::of("Alg2"));
    }

    #[test]
    fn test_manifest_from_json() {
        let manifest = Manifest::from_json(
            r#"{
                "pool": {
                    "top_units": ["Gen/SeqA"],
                    "lazy_creation": true
                },
                "units": [
                    {
                        "name": "SeqA",
                        "type": "Gen",
                        "members": ["Alg1", "Fit/Alg2"],
                        "composition": {
                            "logic": "OR",
                            "exit": "lazy",
                            "sequencing": "sequential"
                        }
                    },
                    { "name": "Alg1", "cardinality": 4, "resources": ["Det"] },
                    { "name": "Alg2", "type": "Fit", "clonable": false, "fail_on": ["begin_run"] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.pool.top_units, vec![TypeName::new("Gen", "SeqA")]);
        assert!(manifest.pool.lazy_creation);
        assert!(!manifest.pool.override_unclonable);
        assert_eq!(manifest.pool.max_depth, PoolConfig::default().max_depth);

        let seq = &manifest.units[0];
        assert_eq!(seq.resolved_type(), "Gen");
        assert_eq!(
            seq.members,
            vec![TypeName::parse("Alg1"), TypeName::new("Fit", "Alg2")]
        );
        assert_eq!(
            seq.composition,
            Composition::new(Logic::Or, Exit::Lazy, Sequencing::Sequential, false)
        );

        let alg1 = &manifest.units[1];
        assert_eq!((alg1.cardinality, alg1.clonable), (4, true));
        assert_eq!(alg1.resources, vec!["Det".to_string()]);

        let alg2 = &manifest.units[2];
        assert!(!alg2.clonable);
        assert_eq!(alg2.cardinality, 1);
        assert_eq!(alg2.fail_on, vec![Transition::BeginRun]);
    }

    #[test]
    fn test_manifest_requires_units() {
        assert!(Manifest::from_json(r#"{ "pool": {} }"#).is_err());
    }
}
