//! Fuzz test runner for the Optimistic Governor
//!
//! Run with: cargo run --release
//! Or: cargo test (for property-based tests)

use anchor_lang::prelude::Pubkey;
use optimistic_governor::state::ProposalStatus;
use optimistic_governor::utils::merkle;
use optimistic_governor_fuzz::*;
use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::test_runner::TestRunner;
use std::time::Instant;

fn main() {
    println!("=== Optimistic Governor Fuzz Testing ===\n");

    let start = Instant::now();
    let mut total_tests = 0;
    let mut passed = 0;
    let mut failed = 0;

    println!("Running propose fuzz tests...");
    let (p, f) = run_propose_fuzz(100);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running execution timing fuzz tests...");
    let (p, f) = run_execution_fuzz(100);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running batch atomicity fuzz tests...");
    let (p, f) = run_atomicity_fuzz(100);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running vote attestation fuzz tests...");
    let (p, f) = run_vote_fuzz(100);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running duplicate proposal race tests...");
    let (p, f) = run_duplicate_race_tests(50);
    passed += p;
    failed += f;
    total_tests += p + f;

    let duration = start.elapsed();

    println!("\n=== Fuzz Testing Complete ===");
    println!("Total tests: {}", total_tests);
    println!("Passed: {}", passed);
    println!("Failed: {}", failed);
    println!("Duration: {:?}", duration);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn generate<T: Arbitrary>(runner: &mut TestRunner) -> Option<T> {
    any::<T>().new_tree(runner).ok().map(|tree| tree.current())
}

fn ledger_for(input: &ProposeInput) -> SimulatedLedger {
    SimulatedLedger::new(
        SimulatedConfig {
            bond_amount: input.bond_amount,
            liveness: input.liveness,
            ..SimulatedConfig::default()
        },
        input.start_time,
    )
}

fn report(name: &str, passed: usize, failed: usize) -> (usize, usize) {
    println!("  {}: {} passed, {} failed", name, passed, failed);
    (passed, failed)
}

fn run_propose_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = TestRunner::default();

    for i in 0..iterations {
        let Some(input) = generate::<ProposeInput>(&mut runner) else {
            failed += 1;
            continue;
        };
        let mut ledger = ledger_for(&input);
        let proposer = Pubkey::new_from_array([1u8; 32]);
        ledger.fund_proposer(proposer);
        let supply = ledger.tokens.total_supply();

        let result = ledger.propose(proposer, input.transactions, input.explanation, None);
        let mut violations = ledger.invariant_violations();
        if result.is_err() {
            violations.push(format!("valid proposal rejected: {:?}", result));
        }
        if check_collateral_conserved(supply, ledger.tokens.total_supply())
            != CollateralInvariantResult::Valid
        {
            violations.push("collateral changed".to_string());
        }

        if violations.is_empty() {
            passed += 1;
        } else {
            println!("  [FAIL] Iteration {}: {:?}", i, violations);
            failed += 1;
        }
    }

    report("propose", passed, failed)
}

fn run_execution_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = TestRunner::default();

    for i in 0..iterations {
        let Some(input) = generate::<ExecutionTimingInput>(&mut runner) else {
            failed += 1;
            continue;
        };
        let mut ledger = ledger_for(&input.proposal);
        let proposer = Pubkey::new_from_array([3u8; 32]);
        ledger.fund_proposer(proposer);
        let Ok(key) = ledger.propose(
            proposer,
            input.proposal.transactions.clone(),
            input.proposal.explanation.clone(),
            None,
        ) else {
            failed += 1;
            continue;
        };
        let before = ledger.status_snapshot();

        if input.settle_first {
            ledger.oracle_settles(&key, input.approved);
            let _ = ledger.settle(key);
        }
        ledger.advance(input.execute_after);
        let window_open = ledger
            .proposal(&key)
            .map_or(true, |p| ledger.now < p.challenge_window_ends);
        let executed = ledger.execute(key, &input.proposal.transactions).is_ok();

        let mut violations =
            SimulatedLedger::transition_violations(&before, &ledger.status_snapshot());
        violations.extend(ledger.invariant_violations());
        let should_execute = input.settle_first && input.approved && !window_open;
        if executed != should_execute {
            violations.push(format!(
                "executed={} expected={}",
                executed, should_execute
            ));
        }

        if violations.is_empty() {
            passed += 1;
        } else {
            println!("  [FAIL] Iteration {}: {:?}", i, violations);
            failed += 1;
        }
    }

    report("execution", passed, failed)
}

fn run_atomicity_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = TestRunner::default();

    for i in 0..iterations {
        let Some(input) = generate::<AtomicityInput>(&mut runner) else {
            failed += 1;
            continue;
        };
        let batch = input.proposal.transactions.clone();
        let mut ledger = ledger_for(&input.proposal);
        let proposer = Pubkey::new_from_array([4u8; 32]);
        ledger.fund_proposer(proposer);
        let Ok(key) = ledger.propose(proposer, batch.clone(), input.proposal.explanation, None)
        else {
            failed += 1;
            continue;
        };
        ledger.oracle_settles(&key, true);
        let _ = ledger.settle(key);
        ledger.advance(input.proposal.liveness);
        if input.inject_failure {
            let target = batch[input.failing_index % batch.len()].to;
            ledger.avatar.failing_targets.insert(target);
        }

        let result = ledger.execute(key, &batch);
        let ran = ledger.avatar.executed.len();
        let status = ledger.proposal(&key).map(|p| p.status);

        let consistent = match result {
            Ok(()) => ran == batch.len() && status == Some(ProposalStatus::Executed),
            Err(_) => ran == 0 && status == Some(ProposalStatus::Resolved),
        };
        if consistent && result.is_err() == input.inject_failure {
            passed += 1;
        } else {
            println!(
                "  [FAIL] Iteration {}: ran {}/{} status {:?}",
                i,
                ran,
                batch.len(),
                status
            );
            failed += 1;
        }
    }

    report("batch_atomicity", passed, failed)
}

fn run_vote_fuzz(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = TestRunner::default();

    for i in 0..iterations {
        let Some(input) = generate::<VoteInput>(&mut runner) else {
            failed += 1;
            continue;
        };
        let Some((resolution, tree)) = build_vote_resolution(&input.voters) else {
            failed += 1;
            continue;
        };
        let mut ledger = SimulatedLedger::new(SimulatedConfig::default(), 1_700_000_000);
        let proposer = Pubkey::new_from_array([6u8; 32]);
        ledger.fund_proposer(proposer);
        let Ok(key) = ledger.propose(
            proposer,
            vec![optimistic_governor::state::GovernanceTransaction {
                to: Pubkey::new_from_array([5u8; 32]),
                value: 0,
                data: vec![],
                operation: Default::default(),
                accounts: vec![],
            }],
            vec![],
            Some(resolution),
        ) else {
            failed += 1;
            continue;
        };

        let (voter, record) = input.voters[input.tampered % input.voters.len()];
        let leaf = merkle::vote_leaf(&voter, record.0, record.1, record.2);
        let proof = tree.proof(&leaf).unwrap_or_default();
        let forged = (record.0.wrapping_add(1), record.1, record.2);

        let forged_rejected = ledger.attest(key, voter, forged, &proof).is_err();
        let genuine_accepted = ledger.attest(key, voter, record, &proof).is_ok();
        let replay_rejected = ledger.attest(key, voter, record, &proof).is_err();

        if forged_rejected && genuine_accepted && replay_rejected {
            passed += 1;
        } else {
            println!(
                "  [FAIL] Iteration {}: forged_rejected={} genuine_accepted={} replay_rejected={}",
                i, forged_rejected, genuine_accepted, replay_rejected
            );
            failed += 1;
        }
    }

    report("vote_attestation", passed, failed)
}

/// Many proposers race to submit the same batch; exactly one may win.
fn run_duplicate_race_tests(iterations: usize) -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = TestRunner::default();

    for i in 0..iterations {
        let Some(input) = generate::<ProposeInput>(&mut runner) else {
            failed += 1;
            continue;
        };
        let mut ledger = ledger_for(&input);
        let proposers: Vec<Pubkey> = (0..(i % 10) + 2)
            .map(|j| Pubkey::new_from_array([j as u8 + 1; 32]))
            .collect();

        let mut winners = 0;
        for proposer in &proposers {
            ledger.fund_proposer(*proposer);
            if ledger
                .propose(
                    *proposer,
                    input.transactions.clone(),
                    input.explanation.clone(),
                    None,
                )
                .is_ok()
            {
                winners += 1;
            }
        }

        let violations = ledger.invariant_violations();
        if winners == 1 && violations.is_empty() {
            passed += 1;
        } else {
            println!(
                "  [FAIL] Race test {}: {} of {} proposers won, {:?}",
                i,
                winners,
                proposers.len(),
                violations
            );
            failed += 1;
        }
    }

    report("duplicate_race", passed, failed)
}
