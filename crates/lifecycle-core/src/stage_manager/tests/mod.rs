#[cfg(test)]
mod registry_tests;

#[cfg(test)]
mod tests {
    use crate::stage_manager::Stage;

    #[test]
    fn test_stage_constants_use_predefined_names() {
        assert_eq!(Stage::CONFIGURE.name(), "configure");
        assert_eq!(Stage::START.name(), "start");
        assert_eq!(Stage::ANNOUNCE.name(), "announce");
        assert_eq!(Stage::UNANNOUNCE.name(), "unannounce");
        assert_eq!(Stage::STOP.name(), "stop");
    }

    #[test]
    fn test_owned_and_static_stages_compare_equal() {
        assert_eq!(Stage::new("start".to_string()), Stage::START);
        assert_eq!(Stage::from("stop"), Stage::STOP);
        assert_eq!(Stage::START.to_string(), "start");
    }
}
