//! Dockarm Headless Scenario Harness
//!
//! Drives the docking-arm scheduler against an in-memory world and checks the
//! shipped data plus the capacity, timing and lifecycle guarantees end to end.
//! No host game, no rendering.
//!
//! Usage:
//!   cargo run -p dockarm-simtest
//!   cargo run -p dockarm-simtest -- --verbose

use dockarm_core::generation::dock_name;
use dockarm_core::prelude::*;
use dockarm_core::systems::placement::sample_annulus;
use dockarm_core::systems::DockRecord;
use hecs::Entity;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Shipped data (same JSON the game loads) ─────────────────────────────
const TEMPLATES_JSON: &str = include_str!("../../../data/dock_templates.json");
const GENERATOR_JSON: &str = include_str!("../../../data/station_generator.json");

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn check(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");

    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    println!("=== Dockarm Scenario Harness ===\n");

    let mut results = Vec::new();

    // 1. Shipped data
    let Some((catalog, config)) = validate_data(&mut results) else {
        return finish(&results, verbose);
    };

    // 2. Cooldown gating
    results.extend(validate_cooldown(&catalog, &config));

    // 3. Placement distribution
    results.extend(validate_placement(&config));

    // 4. Capacity limits
    results.extend(validate_concurrent_limit(&catalog, &config));
    results.extend(validate_total_limit(&catalog, &config));

    // 5. Broken template wiring
    results.extend(validate_missing_template(&catalog, &config));

    // 6. Long soak with random destruction
    results.extend(validate_soak(&catalog, &config));

    // 7. Rounds and persistence
    results.extend(validate_round_restart(&catalog, &config));
    results.extend(validate_save_load(&catalog, &config));

    finish(&results, verbose);
}

fn finish(results: &[TestResult], verbose: bool) {
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    println!();
    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }
    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );

    if failed > 0 || results.is_empty() {
        std::process::exit(1);
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Engine that schedules on every update, so scenarios control time exactly
fn engine(catalog: &StructureCatalog, seed: u64) -> DockingEngine {
    let mut engine = DockingEngine::new(catalog.clone(), seed);
    engine.set_scheduling_interval(0.0);
    engine
}

fn advance(engine: &mut DockingEngine, secs: f64) -> Vec<CycleReport> {
    engine.update(secs as f32)
}

fn spawned_in(reports: &[CycleReport]) -> Vec<&DockRecord> {
    reports.iter().filter_map(|r| r.outcome.spawned()).collect()
}

// ── 1. Shipped Data ─────────────────────────────────────────────────────

fn validate_data(results: &mut Vec<TestResult>) -> Option<(StructureCatalog, GeneratorConfig)> {
    println!("--- Shipped Data ---");

    let catalog = match StructureCatalog::from_json_str(TEMPLATES_JSON) {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult::check("templates_parse", false, format!("{}", e)));
            return None;
        }
    };
    results.push(TestResult::check(
        "templates_parse",
        !catalog.is_empty(),
        format!("{} templates: {}", catalog.len(), catalog.ids().join(", ")),
    ));

    let mut bad_footprints = Vec::new();
    for id in catalog.ids() {
        if let Some(def) = catalog.resolve(id) {
            if !(def.footprint_radius > 0.0) {
                bad_footprints.push(id.to_string());
            }
        }
    }
    results.push(TestResult::check(
        "templates_positive_footprint",
        bad_footprints.is_empty(),
        if bad_footprints.is_empty() {
            "all templates have a footprint".to_string()
        } else {
            format!("no footprint: {:?}", bad_footprints)
        },
    ));

    let config = match GeneratorConfig::from_json_str(GENERATOR_JSON) {
        Ok(c) => c,
        Err(e) => {
            results.push(TestResult::check("generator_config_valid", false, format!("{}", e)));
            return None;
        }
    };
    results.push(TestResult::check(
        "generator_config_valid",
        true,
        format!(
            "cooldown {}s, ring {}..{}, {} concurrent / {} total",
            config.unlock_cooldown_secs,
            config.min_spawn_distance,
            config.max_spawn_distance,
            config.max_concurrent_docks,
            config.max_total_generated
        ),
    ));

    let unknown: Vec<_> = config
        .template_candidates
        .iter()
        .filter(|id| !catalog.contains(id))
        .collect();
    results.push(TestResult::check(
        "generator_candidates_in_catalog",
        unknown.is_empty(),
        if unknown.is_empty() {
            format!("{} candidates resolve", config.template_candidates.len())
        } else {
            format!("unknown candidates: {:?}", unknown)
        },
    ));

    Some((catalog, config))
}

// ── 2. Cooldown ─────────────────────────────────────────────────────────

fn validate_cooldown(catalog: &StructureCatalog, config: &GeneratorConfig) -> Vec<TestResult> {
    println!("--- Cooldown Gating ---");
    let mut results = Vec::new();
    let cooldown = config.unlock_cooldown_secs;
    let config = GeneratorConfig {
        max_concurrent_docks: 100,
        max_total_generated: 100,
        ..config.clone()
    };

    let mut engine = engine(catalog, 1);
    let Ok(station) = engine.add_generator("Cooldown Station", Vec2::ZERO, config) else {
        results.push(TestResult::check("cooldown_setup", false, "generator rejected"));
        return results;
    };

    let first = advance(&mut engine, 1.0);
    results.push(TestResult::check(
        "initial_unlock_is_immediate",
        spawned_in(&first).len() == 1,
        format!("{} docks on first update", spawned_in(&first).len()),
    ));

    // Step in 1s increments for four cooldowns and record every spawn time
    let mut spawn_times = Vec::new();
    let steps = (cooldown * 4.0) as usize;
    for _ in 0..steps {
        for report in advance(&mut engine, 1.0) {
            if report.generator == station && report.outcome.spawned().is_some() {
                spawn_times.push(report.at.as_secs());
            }
        }
    }

    let gaps: Vec<f64> = std::iter::once(1.0)
        .chain(spawn_times.iter().copied())
        .collect::<Vec<_>>()
        .windows(2)
        .map(|w| w[1] - w[0])
        .collect();
    let too_early = gaps.iter().filter(|g| **g < cooldown - 1e-6).count();
    results.push(TestResult::check(
        "no_spawn_before_cooldown",
        too_early == 0 && spawn_times.len() == 4,
        format!("{} spawns over {}s, gaps {:?}", spawn_times.len(), steps, gaps),
    ));

    results
}

// ── 3. Placement ────────────────────────────────────────────────────────

fn validate_placement(config: &GeneratorConfig) -> Vec<TestResult> {
    println!("--- Placement Distribution ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(2024);
    let origin = Vec2::new(-1_500.0, 750.0);
    let (inner, outer) = (config.min_spawn_distance, config.max_spawn_distance);

    const SAMPLES: usize = 20_000;
    const BUCKETS: usize = 10;
    let mut outside = 0;
    let mut buckets = [0usize; BUCKETS];
    let span = outer * outer - inner * inner;
    for _ in 0..SAMPLES {
        let p = sample_annulus(origin, inner, outer, &mut rng);
        let d = p.distance(&origin);
        if d < inner - 1e-2 || d > outer + 1e-2 {
            outside += 1;
            continue;
        }
        let frac = ((d * d - inner * inner) / span).clamp(0.0, 0.999_999);
        buckets[(frac * BUCKETS as f32) as usize] += 1;
    }
    results.push(TestResult::check(
        "samples_inside_ring",
        outside == 0,
        format!("{} of {} samples outside {}..{}", outside, SAMPLES, inner, outer),
    ));

    // Equal-area buckets should each get ~10%
    let expected = SAMPLES / BUCKETS;
    let worst = buckets
        .iter()
        .map(|b| (*b as i64 - expected as i64).abs())
        .max()
        .unwrap_or(0);
    results.push(TestResult::check(
        "samples_uniform_by_area",
        worst < (expected as i64) / 10,
        format!("buckets {:?}, worst deviation {}", buckets, worst),
    ));

    results
}

// ── 4. Capacity ─────────────────────────────────────────────────────────

fn validate_concurrent_limit(catalog: &StructureCatalog, config: &GeneratorConfig) -> Vec<TestResult> {
    println!("--- Concurrent Limit ---");
    let mut results = Vec::new();
    let cooldown = config.unlock_cooldown_secs;
    let config = GeneratorConfig {
        max_concurrent_docks: 1,
        max_total_generated: 10,
        ..config.clone()
    };

    let mut engine = engine(catalog, 2);
    let Ok(station) = engine.add_generator("Capacity Station", Vec2::ZERO, config) else {
        results.push(TestResult::check("concurrent_setup", false, "generator rejected"));
        return results;
    };

    let first = advance(&mut engine, 1.0);
    let dock1 = spawned_in(&first).first().map(|r| r.entity);

    let blocked = advance(&mut engine, cooldown);
    let denied = blocked
        .iter()
        .any(|r| r.outcome == CycleOutcome::Denied(AdmissionDenied::ConcurrentLimitReached));
    results.push(TestResult::check(
        "concurrent_limit_denies",
        dock1.is_some() && denied && engine.dock_count() == 1,
        format!("{} live docks after second unlock", engine.dock_count()),
    ));

    if let Some(dock1) = dock1 {
        engine.destroy_dock(dock1);
    }
    let after = advance(&mut engine, cooldown);
    let ids: Vec<_> = spawned_in(&after).iter().map(|r| r.id).collect();
    let active = engine
        .generator(station)
        .map(|s| s.ledger().active().map(|r| r.id).collect::<Vec<_>>())
        .unwrap_or_default();
    results.push(TestResult::check(
        "destruction_frees_capacity",
        ids == vec![2] && active == vec![2],
        format!("spawned {:?}, active {:?}", ids, active),
    ));

    results
}

fn validate_total_limit(catalog: &StructureCatalog, config: &GeneratorConfig) -> Vec<TestResult> {
    println!("--- Total Limit ---");
    let mut results = Vec::new();
    let cooldown = config.unlock_cooldown_secs;
    let config = GeneratorConfig {
        max_concurrent_docks: 2,
        max_total_generated: 2,
        ..config.clone()
    };

    let mut engine = engine(catalog, 3);
    if engine.add_generator("Budget Station", Vec2::ZERO, config).is_err() {
        results.push(TestResult::check("total_setup", false, "generator rejected"));
        return results;
    }

    let mut docks: Vec<Entity> = Vec::new();
    docks.extend(spawned_in(&advance(&mut engine, 1.0)).iter().map(|r| r.entity));
    docks.extend(spawned_in(&advance(&mut engine, cooldown)).iter().map(|r| r.entity));
    for dock in &docks {
        engine.destroy_dock(*dock);
    }

    let mut denials = 0;
    let mut spawns = 0;
    for _ in 0..20 {
        for report in advance(&mut engine, cooldown) {
            match report.outcome {
                CycleOutcome::Denied(AdmissionDenied::TotalLimitReached) => denials += 1,
                CycleOutcome::Spawned(_) => spawns += 1,
                _ => {}
            }
        }
    }
    results.push(TestResult::check(
        "total_limit_is_permanent",
        docks.len() == 2 && spawns == 0 && denials == 20,
        format!("{} initial docks, {} later spawns, {} denials", docks.len(), spawns, denials),
    ));

    results
}

// ── 5. Missing Template ─────────────────────────────────────────────────

fn validate_missing_template(catalog: &StructureCatalog, config: &GeneratorConfig) -> Vec<TestResult> {
    println!("--- Missing Template ---");
    let mut results = Vec::new();
    let cooldown = config.unlock_cooldown_secs;
    let config = GeneratorConfig {
        template_candidates: vec!["docking_arm_unreleased".into()],
        ..config.clone()
    };

    let mut engine = engine(catalog, 4);
    let Ok(station) = engine.add_generator("Misconfigured Station", Vec2::ZERO, config) else {
        results.push(TestResult::check("missing_template_setup", false, "generator rejected"));
        return results;
    };

    // Ten cooldowns in one-second steps: one attempt per cooldown, not per tick
    let mut attempts = 0;
    for _ in 0..(cooldown as usize * 10) {
        attempts += advance(&mut engine, 1.0).len();
    }

    let (generated, counter, not_found) = engine
        .generator(station)
        .map(|s| (s.generated_count(), s.dock_sequence_counter(), s.stats().template_not_found))
        .unwrap_or((usize::MAX, 0, 0));
    results.push(TestResult::check(
        "missing_template_commits_nothing",
        generated == 0 && counter == 1 && engine.dock_count() == 0,
        format!("generated {}, sequence counter {}", generated, counter),
    ));
    results.push(TestResult::check(
        "missing_template_no_retry_storm",
        (10..=11).contains(&attempts) && not_found as usize == attempts,
        format!("{} attempts over {} ticks", attempts, cooldown as usize * 10),
    ));

    results
}

// ── 6. Soak ─────────────────────────────────────────────────────────────

fn validate_soak(catalog: &StructureCatalog, config: &GeneratorConfig) -> Vec<TestResult> {
    println!("--- Soak ---");
    let mut results = Vec::new();
    let config = GeneratorConfig {
        unlock_cooldown_secs: 20.0,
        max_total_generated: 40,
        ..config.clone()
    };

    let mut engine = DockingEngine::new(catalog.clone(), 5).with_host_limits(HostLimits {
        max_structures: Some(10),
        ..Default::default()
    });
    let stations: Vec<Entity> = (0..5)
        .filter_map(|i| {
            let origin = Vec2::from_angle(i as f32 * 1.2566) * 5_000.0;
            engine
                .add_generator(format!("Soak Station {}", i + 1), origin, config.clone())
                .ok()
        })
        .collect();

    let mut rng = StdRng::seed_from_u64(6);
    let notifier = engine.notifier();
    let mut violations = Vec::new();
    let mut over_limit = 0;
    let mut destroyed = 0;
    const TICKS: usize = 20_000;
    for tick in 0..TICKS {
        engine.update(rng.gen_range(0.05..0.5));

        if rng.gen_bool(0.02) {
            let station = stations[rng.gen_range(0..stations.len())];
            let victim = engine
                .generator(station)
                .and_then(|s| s.ledger().active_entities().first().copied());
            if let Some(victim) = victim {
                destroyed += 1;
                if rng.gen_bool(0.5) {
                    engine.destroy_dock(victim);
                } else {
                    let _ = engine.world.despawn(victim);
                    if rng.gen_bool(0.5) {
                        let _ = notifier.send(victim);
                    }
                }
            }
        }

        for (generator, violation) in engine.invariant_violations() {
            violations.push(format!("tick {} {:?}: {}", tick, generator, violation));
        }
        over_limit += stations
            .iter()
            .filter_map(|s| engine.generator(*s))
            .filter(|s| s.active_count() > config.max_concurrent_docks as usize)
            .count();
    }

    let generated: usize = stations
        .iter()
        .filter_map(|s| engine.generator(*s).map(|g| g.generated_count()))
        .sum();
    results.push(TestResult::check(
        "soak_invariants_hold",
        violations.is_empty() && over_limit == 0,
        if violations.is_empty() {
            format!("{} ticks, {} docks spawned, {} destroyed", TICKS, generated, destroyed)
        } else {
            format!("{} violations, first: {}", violations.len(), violations[0])
        },
    ));
    results.push(TestResult::check(
        "soak_makes_progress",
        generated > stations.len() * 5,
        format!("{} docks across {} stations", generated, stations.len()),
    ));

    results
}

// ── 7. Rounds & Persistence ─────────────────────────────────────────────

fn validate_round_restart(catalog: &StructureCatalog, config: &GeneratorConfig) -> Vec<TestResult> {
    println!("--- Round Restart ---");
    let mut results = Vec::new();
    let cooldown = config.unlock_cooldown_secs;

    let mut engine = engine(catalog, 7);
    let Ok(station) = engine.add_generator("Round Station", Vec2::ZERO, config.clone()) else {
        results.push(TestResult::check("round_setup", false, "generator rejected"));
        return results;
    };
    advance(&mut engine, 1.0);
    advance(&mut engine, cooldown);
    let deadline = engine.generator(station).map(|s| s.next_unlock_at());

    engine.restart_round();
    let state = engine
        .generator(station)
        .map(|s| (s.generated_count(), s.dock_sequence_counter(), s.next_unlock_at()));
    results.push(TestResult::check(
        "round_restart_clears_session",
        engine.dock_count() == 0 && state.map(|s| (s.0, s.1)) == Some((0, 1)),
        format!("{} live docks, session {:?}", engine.dock_count(), state),
    ));
    results.push(TestResult::check(
        "round_restart_keeps_deadline",
        deadline.is_some() && state.map(|s| s.2) == deadline,
        format!("deadline {:?}", deadline),
    ));

    // Step past the kept deadline; nothing may spawn before it
    let mut spawns = Vec::new();
    let until = deadline.map(|d| d.after(1.0)).unwrap_or(Timestamp::ZERO);
    while engine.now() < until {
        for report in advance(&mut engine, 1.0) {
            if let Some(record) = report.outcome.spawned() {
                spawns.push((record.name.clone(), record.created_at));
            }
        }
    }
    let early = spawns
        .iter()
        .filter(|(_, at)| deadline.map_or(true, |d| *at < d))
        .count();
    results.push(TestResult::check(
        "round_restart_respects_deadline",
        early == 0 && !spawns.is_empty(),
        format!("{} spawns before {:?}", early, deadline),
    ));

    let names: Vec<_> = spawns.iter().map(|(name, _)| name.clone()).collect();
    results.push(TestResult::check(
        "round_restart_numbers_from_one",
        names == vec![dock_name(1)],
        format!("first dock of round {}: {:?}", engine.round(), names),
    ));

    results
}

fn validate_save_load(catalog: &StructureCatalog, config: &GeneratorConfig) -> Vec<TestResult> {
    println!("--- Save / Load ---");
    let mut results = Vec::new();

    let mut engine = engine(catalog, 8);
    for i in 0..3 {
        let origin = Vec2::new(i as f32 * 2_000.0, 0.0);
        if engine.add_generator(format!("Saved Station {}", i + 1), origin, config.clone()).is_err() {
            results.push(TestResult::check("save_setup", false, "generator rejected"));
            return results;
        }
    }
    advance(&mut engine, 1.0);
    advance(&mut engine, 250.0);

    let mut buffer = Vec::new();
    if let Err(e) = engine.save(&mut buffer) {
        results.push(TestResult::check("save_roundtrip", false, format!("save failed: {}", e)));
        return results;
    }

    let mut loaded = DockingEngine::new(catalog.clone(), 9);
    if let Err(e) = loaded.load(&buffer[..]) {
        results.push(TestResult::check("save_roundtrip", false, format!("load failed: {}", e)));
        return results;
    }

    let deadlines = |e: &DockingEngine| -> Vec<Timestamp> {
        e.generators()
            .into_iter()
            .filter_map(|g| e.generator(g).map(|s| s.next_unlock_at()))
            .collect()
    };
    results.push(TestResult::check(
        "save_roundtrip",
        loaded.generator_count() == 3 && deadlines(&loaded) == deadlines(&engine),
        format!("{} bytes, {} generators restored", buffer.len(), loaded.generator_count()),
    ));
    results.push(TestResult::check(
        "load_starts_fresh_session",
        loaded.dock_count() == 0 && loaded.now() == engine.now(),
        format!("{} docks after load at {:.1}s", loaded.dock_count(), loaded.now().as_secs()),
    ));

    results
}
