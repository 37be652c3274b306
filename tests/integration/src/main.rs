//! Integration Test Harness
//!
//! Runs every integration test category and prints a summary.
//!
//! # Usage
//!
//! Run all tests:
//! ```text
//! cargo run -p integration-tests
//! ```
//!
//! Run one category:
//! ```text
//! cargo test -p integration-tests --test refcount_tests
//! cargo test -p integration-tests --test cast_tests
//! cargo test -p integration-tests --test exception_tests
//! cargo test -p integration-tests --test locality_tests
//! cargo test -p integration-tests --test tcp_tests
//! ```

use std::process::Command;
use std::time::{Duration, Instant};

/// Test category
#[derive(Debug, Clone)]
struct TestCategory {
    name: &'static str,
    description: &'static str,
    test_name: &'static str,
}

const TEST_CATEGORIES: &[TestCategory] = &[
    TestCategory {
        name: "Reference Counting",
        description: "One addRef per handle, one release per last holder",
        test_name: "refcount_tests",
    },
    TestCategory {
        name: "Casts",
        description: "Static tables, connect registry, identity",
        test_name: "cast_tests",
    },
    TestCategory {
        name: "Exceptions",
        description: "Trace annotation per hop, error kinds",
        test_name: "exception_tests",
    },
    TestCategory {
        name: "Locality",
        description: "Local shortcuts, create, class info, object arguments",
        test_name: "locality_tests",
    },
    TestCategory {
        name: "TCP",
        description: "End-to-end over sockets",
        test_name: "tcp_tests",
    },
];

fn print_banner() {
    println!("{}", "=".repeat(80));
    println!("     remobj integration test suite");
    println!("{}", "=".repeat(80));
}

fn print_test_categories() {
    println!("Test Categories:");
    println!("{}", "-".repeat(80));
    for (i, cat) in TEST_CATEGORIES.iter().enumerate() {
        println!("  {}. {} - {}", i + 1, cat.name, cat.description);
    }
    println!("{}", "-".repeat(80));
    println!();
}

fn run_test_category(category: &TestCategory) -> (bool, Duration, String) {
    println!("\n{}", "=".repeat(80));
    println!("Running: {}", category.name);
    println!("{}", "=".repeat(80));

    let start = Instant::now();
    let output = Command::new("cargo")
        .args([
            "test",
            "-p",
            "integration-tests",
            "--test",
            category.test_name,
            "--",
            "--nocapture",
        ])
        .output();
    let duration = start.elapsed();

    match output {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stdout.is_empty() {
                println!("{}", stdout);
            }
            if !stderr.is_empty() {
                eprintln!("{}", stderr);
            }

            let success = output.status.success();
            let summary = if success {
                "PASSED".to_string()
            } else {
                format!("FAILED (exit code: {:?})", output.status.code())
            };
            (success, duration, summary)
        }
        Err(e) => (false, duration, format!("Failed to execute: {}", e)),
    }
}

fn main() {
    print_banner();
    print_test_categories();

    let total_start = Instant::now();
    let results: Vec<_> = TEST_CATEGORIES
        .iter()
        .map(|category| {
            let (success, duration, summary) = run_test_category(category);
            (category.name, success, duration, summary)
        })
        .collect();
    let total_duration = total_start.elapsed();

    println!("\n{}", "=".repeat(80));
    println!("FINAL SUMMARY");
    println!("{}", "=".repeat(80));

    let failed = results.iter().filter(|(_, s, _, _)| !*s).count();
    println!(
        "\nCategories: {} | Passed: {} | Failed: {}",
        results.len(),
        results.len() - failed,
        failed
    );
    println!("Total Duration: {:?}\n", total_duration);

    println!("{:<30} {:<10} {:<15} Details", "Category", "Status", "Duration");
    println!("{}", "-".repeat(80));
    for (name, success, duration, summary) in &results {
        let status = if *success { "PASS" } else { "FAIL" };
        println!("{:<30} {:<10} {:<15?} {}", name, status, duration, summary);
    }
    println!("{}", "=".repeat(80));

    if failed > 0 {
        println!("\nSome tests failed!");
        std::process::exit(1);
    }
    println!("\nAll tests passed!");
}
