use predicates::str::diff;

#[test]
fn list_distributions_prints_supported_values() {
    let expected = concat!(
        "Arrival distributions:\n",
        "  exponential (--arrival-rate)\n",
        "  constant-rate (--arrival-rate)\n",
        "  fixed-interval (--arrival-interval)\n",
        "Service distributions:\n",
        "  exponential (--service-rate)\n",
        "  constant (--service-time)\n",
        "  normal (--service-mean, --service-std-dev)\n",
    );

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("queue-sim");
    cmd.arg("list-distributions");
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn show_config_prints_parsed_configuration() {
    let expected = concat!(
        "Metadata:\n",
        "arrival: exponential(rate=5)\n",
        "service: normal(mean=0.15, std_dev=0.05)\n",
        "servers: 3\n",
        "stop: customer-count(100)\n",
        "assignment: release-order\n",
        "seed: 42\n",
    );

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("queue-sim");
    cmd.args([
        "show-config",
        "--arrival",
        "exponential",
        "--arrival-rate",
        "5",
        "--service",
        "normal",
        "--service-mean",
        "0.15",
        "--service-std-dev",
        "0.05",
        "--servers",
        "3",
        "--stop-customers",
        "100",
        "--seed",
        "42",
    ]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn optimize_summary_recommends_smallest_valid_count() {
    let expected = concat!(
        "Metadata:\n",
        "objective: minimize-servers\n",
        "servers: 1-3 (2 replications each)\n",
        "constraints: max_avg_utilization=30\n",
        "Comparison:\n",
        "1 servers: avg wait 0.0000, avg queue 0.0000, avg utilization 49.50%, avg served 99.00\n",
        "2 servers: avg wait 0.0000, avg queue 0.0000, avg utilization 24.75%, avg served 99.00\n",
        "3 servers: avg wait 0.0000, avg queue 0.0000, avg utilization 16.50%, avg served 99.00\n",
        "Recommendation: 2 servers\n",
    );

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("queue-sim");
    cmd.args([
        "optimize",
        "--arrival",
        "fixed-interval",
        "--arrival-interval",
        "1",
        "--service",
        "constant",
        "--service-time",
        "0.5",
        "--stop-time",
        "100",
        "--min-servers",
        "1",
        "--max-servers",
        "3",
        "--replications",
        "2",
        "--objective",
        "minimize-servers",
        "--max-avg-utilization",
        "30",
        "--format",
        "summary",
    ]);
    cmd.assert().success().stdout(diff(expected));
}

#[test]
fn optimize_without_valid_candidates_still_succeeds() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("queue-sim");
    cmd.args([
        "optimize",
        "--arrival",
        "fixed-interval",
        "--arrival-interval",
        "1",
        "--service",
        "constant",
        "--service-time",
        "0.5",
        "--stop-time",
        "20",
        "--max-servers",
        "2",
        "--replications",
        "1",
        "--max-avg-utilization",
        "1",
        "--format",
        "summary",
    ]);
    cmd.assert().success().stdout(predicates::str::contains(
        "Recommendation: none (no configuration satisfies constraints)\n",
    ));
}
