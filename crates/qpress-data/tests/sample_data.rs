//! The shipped sample data directory loads and every scenario runs.

use std::path::PathBuf;

use qpress_core::config::{CostRates, Horizon};
use qpress_data::load_data_dir;

fn sample_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

#[test]
fn sample_data_loads() {
    let data = load_data_dir(&sample_dir()).unwrap();
    assert_eq!(data.registry.zone_count(), 3);

    let chiloe = data.registry.centers("CHILOE").unwrap();
    assert_eq!(chiloe[1].batea_capacity_t, 10.0);
    assert_eq!(chiloe[2].ts_in, 0.04);
    assert_eq!(chiloe[0].batea_capacity_t, 15.0);

    let names: Vec<&str> = data.scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        ["sur_30m3", "sur_30m3_priced", "norte_2_days", "chiloe_40m3"]
    );

    let norte = data.scenario("norte_2_days").unwrap();
    assert_eq!(norte.config.horizon, Horizon::Days { days: 2 });
    assert_eq!(norte.config.costs, CostRates::DAYS_TARIFF);

    let chiloe_run = data.scenario("chiloe_40m3").unwrap();
    assert_eq!(chiloe_run.config.q_proc_m3h, 8.0);
    assert_eq!(chiloe_run.config.step_min, 5);
}

#[test]
fn sample_scenarios_run() {
    let data = load_data_dir(&sample_dir()).unwrap();
    let results = data.run_all();
    assert_eq!(results.len(), 4);

    for (name, result) in &results {
        let out = result.as_ref().unwrap();
        assert!(!out.log.is_empty(), "{name} produced no log rows");
    }

    let plain = results[0].1.as_ref().unwrap();
    let priced = results[1].1.as_ref().unwrap();
    assert_eq!(plain.kpis.total_cost, 0);
    assert!(priced.kpis.total_cost > 0);
    assert_eq!(plain.log, priced.log);
}
