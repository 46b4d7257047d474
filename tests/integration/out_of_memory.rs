use lox_memory::runtime::memory::{AllocError, DynArray, Limited, System};
use lox_memory::simulate_growth;
use lox_memory::util::config::{parse_config, FailurePolicy};

#[test]
fn test_budget_exhaustion_is_recoverable() {
    let mut constants = DynArray::new_in(Limited::new(System, 8 * 16));
    let mut pushed = 0u64;
    let err = loop {
        match constants.try_push(pushed as f64) {
            Ok(()) => pushed += 1,
            Err(err) => break err,
        }
    };

    assert_eq!(pushed, 16);
    assert_eq!(err, AllocError::OutOfMemory { size: 256, align: 8 });
    assert_eq!(constants.allocator().in_use(), 128);

    // Releasing gives the whole budget back
    constants.free();
    assert_eq!(constants.allocator().in_use(), 0);
}

#[test]
fn test_configured_limit_reports_failure() {
    let config = parse_config("(heap_limit: Some(512), on_failure: Report)").unwrap();
    assert_eq!(config.on_failure, FailurePolicy::Report);

    let report = simulate_growth(1000, &config).unwrap();
    assert_eq!(report.appended, 64);
    assert_eq!(report.capacities(), vec![0, 8, 16, 32, 64]);
    assert!(report.error.unwrap().starts_with("out of memory"));
}

#[test]
fn test_report_serializes_to_json() {
    let report = simulate_growth(9, &Default::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["reallocations"], 2);
    assert_eq!(json["transitions"][0]["kind"], "allocate");
    assert_eq!(json["transitions"][1]["new_size"], 128);
}
