//! Compile benchmarks — rule ingestion and program builds.
//!
//! Measures: single-rule updates, rule-count scaling, the scope cache
//! warm/cold split, and text-source parsing.

use std::sync::Arc;

use snare::prelude::*;
use snare_test::{dict, order_base};

fn main() {
    divan::main();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Fixtures
// ═══════════════════════════════════════════════════════════════════════════════

fn sized_rules(n: usize) -> RuleSet {
    let mut set = RuleSet::new();
    for i in 0..n {
        set.insert(&format!("R{i:04}"), format!("@id:={i}"));
    }
    set
}

// ═══════════════════════════════════════════════════════════════════════════════
// Single-rule update (baseline)
// ═══════════════════════════════════════════════════════════════════════════════

#[divan::bench]
fn update_single_rule(bencher: divan::Bencher) {
    let trap = Trap::new(order_base(), Arc::new(dict()));
    let mut rules = RuleSet::new();
    rules.insert("Senior", ">Customer@age:>65");

    bencher.bench_local(|| trap.update(&rules).unwrap());
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scaling: rule count
// ═══════════════════════════════════════════════════════════════════════════════

#[divan::bench(args = [10, 100, 1000])]
fn update_rule_count(bencher: divan::Bencher, n: usize) {
    let trap = Trap::new(order_base(), Arc::new(dict()));
    let rules = sized_rules(n);

    bencher.bench_local(|| trap.update(&rules).unwrap());
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scope cache: cold builds vs warm recompiles
// ═══════════════════════════════════════════════════════════════════════════════

#[divan::bench]
fn update_cold_scope_cache(bencher: divan::Bencher) {
    let rules = sized_rules(100);

    bencher
        .with_inputs(|| Trap::new(order_base(), Arc::new(dict())))
        .bench_local_values(|trap| trap.update(&rules).unwrap());
}

#[divan::bench]
fn update_warm_scope_cache(bencher: divan::Bencher) {
    let rules = sized_rules(100);
    let trap = Trap::new(order_base(), Arc::new(dict()));
    trap.update(&rules).unwrap();

    // Every path is already cached; the update is pure relayout.
    bencher.bench_local(|| trap.update(&rules).unwrap());
}

// ═══════════════════════════════════════════════════════════════════════════════
// Text-source parsing
// ═══════════════════════════════════════════════════════════════════════════════

#[divan::bench(args = [10, 100, 1000])]
fn rule_set_from_text(bencher: divan::Bencher, n: usize) {
    let mut source = String::from("# benchmark rules\n");
    for i in 0..n {
        source.push_str(&format!("R{i:04} = @id:={i}\n"));
    }

    bencher.bench_local(|| RuleSet::from_text(&source).unwrap());
}
