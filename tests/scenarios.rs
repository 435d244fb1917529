//! Rule scenarios played through the public library API.
//!
//! Each test sets up a board, queues orders the way clients would, runs the
//! executor and settlement, and checks the resulting state.

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use hegemon::board::{upgrade_cost, GameState, Map, Order, PlayerId, TerritoryId, MAX_LEVEL};
use hegemon::config::GameConfig;
use hegemon::protocol::{parse_instruction, Instruction};
use hegemon::resolve::{
    execute_orders, path_cost, settle, OrderResult, RejectReason, RngDice, ScriptedDice,
};
use hegemon::turn::{ChannelLink, Coordinator, TurnPhase};

const ALICE: PlayerId = PlayerId(0);
const BOB: PlayerId = PlayerId(1);
const CAROL: PlayerId = PlayerId(2);

fn session(players: usize, food: u32, tech: u32) -> GameState {
    let mut state = GameState::new(Map::for_players(players).unwrap());
    for name in ["alice", "bob", "carol", "dave", "erin"].iter().take(players) {
        state.add_player(*name, food, tech);
    }
    state.assign_starting_territories();
    state
}

fn id(state: &GameState, name: &str) -> TerritoryId {
    state.find_territory(name).unwrap()
}

/// Parses client lines the way the coordinator does.
fn orders(player: PlayerId, lines: &[&str]) -> Vec<Order> {
    lines
        .iter()
        .filter_map(|line| match parse_instruction(line, player) {
            Ok(Some(Instruction::Order(order))) => Some(order),
            _ => None,
        })
        .collect()
}

fn rejection(report: &hegemon::resolve::RoundReport, index: usize) -> Option<&RejectReason> {
    match &report.orders[index].result {
        OrderResult::Rejected(reason) => Some(reason),
        OrderResult::Applied => None,
    }
}

#[test]
fn two_player_round_end_to_end() {
    for seed in 0..20 {
        let config = GameConfig {
            player_count: 2,
            initial_units: 10,
            seed: Some(seed),
            ..GameConfig::default()
        };
        let mut coordinator = Coordinator::new(config).unwrap();
        let (link, alice) = ChannelLink::pair(None);
        coordinator.join("alice", Box::new(link)).unwrap();
        let (link, bob) = ChannelLink::pair(None);
        coordinator.join("bob", Box::new(link)).unwrap();

        // Alice: Ashford 4, Brackwater 3, Coldharbour 3.
        // Bob: Dunmore 5, Eastmarch 3, Fellreach 2.
        alice.feed(["4", "3", "A Coldharbour Eastmarch 0 3", "D"]);
        bob.feed(["5", "3", "D"]);
        coordinator.place_initial_units().unwrap();
        for player in [ALICE, BOB] {
            let total: u32 = coordinator
                .state()
                .player(player)
                .unwrap()
                .territories()
                .iter()
                .map(|&t| coordinator.state().territory(t).units.total())
                .sum();
            assert_eq!(total, 10);
        }

        coordinator.collect_orders().unwrap();
        let report = coordinator.execute().unwrap();
        assert_eq!(report.applied(), 1);
        assert_eq!(report.battles.len(), 1);

        let state = coordinator.state();
        let source = state.territory(id(state, "Coldharbour"));
        assert_eq!(source.owner(), Some(ALICE));
        assert_eq!(source.units.count(0), 0);

        let east = state.territory(id(state, "Eastmarch"));
        let battle = &report.battles[0];
        if battle.conquered {
            assert_eq!(east.owner(), Some(ALICE));
            assert_eq!(east.units.total(), 3 - battle.casualties.attacker);
            assert!(east.units.total() > 0);
        } else {
            assert_eq!(east.owner(), Some(BOB));
            assert_eq!(battle.casualties.attacker, 3);
            assert_eq!(east.units.total(), 3 - battle.casualties.defender);
            assert!(east.units.total() > 0);
        }
        assert!(state.ownership_is_consistent());

        coordinator.end_turn().unwrap();
        assert_eq!(coordinator.phase(), TurnPhase::IssueOrders);
    }
}

#[test]
fn two_player_round_resolves_every_stage() {
    let mut state = session(2, 50, 100);
    state.place_units(id(&state, "Ashford"), 0, 4);
    state.place_units(id(&state, "Brackwater"), 0, 3);
    state.place_units(id(&state, "Coldharbour"), 0, 3);
    state.place_units(id(&state, "Dunmore"), 0, 10);

    let mut queue = orders(ALICE, &["A Coldharbour Eastmarch 0 3", "U Ashford 0 1 2", "T"]);
    queue.extend(orders(BOB, &["M Dunmore Fellreach 0 5", "A Dunmore Brackwater 0 5"]));

    // Alice wins her fight on an empty Eastmarch; bob's attack on
    // Brackwater always wins its rolls.
    let report = execute_orders(&mut state, &queue, &mut ScriptedDice::fixed(20, 1));
    assert_eq!(report.applied(), 5);
    assert_eq!(report.battles.len(), 2);
    assert_eq!(state.territory(id(&state, "Coldharbour")).units.count(0), 0);

    assert_eq!(state.territory(id(&state, "Eastmarch")).owner(), Some(ALICE));
    assert_eq!(state.territory(id(&state, "Brackwater")).owner(), Some(BOB));
    assert_eq!(state.territory(id(&state, "Brackwater")).units.count(0), 5);
    assert_eq!(state.territory(id(&state, "Fellreach")).units.count(0), 5);
    assert_eq!(state.territory(id(&state, "Ashford")).units.count(1), 2);

    let settlement = settle(&mut state);
    assert_eq!(settlement.upgraded, vec![(ALICE, 2)]);
    assert!(settlement.eliminated.is_empty());
    assert_eq!(settlement.winner, None);
    assert!(state.ownership_is_consistent());

    // Alice: Ashford 2 + Coldharbour 3 + Eastmarch 3; bob: Brackwater 1 +
    // Dunmore 2 + Fellreach 1.
    let alice = state.player(ALICE).unwrap();
    assert_eq!(alice.food(), 50 - 3 + 8);
    assert_eq!(alice.tech(), 100 - 2 * upgrade_cost(0, 1, 1).unwrap() - 50 + 8);
    let bob = state.player(BOB).unwrap();
    assert_eq!(bob.food(), 50 - 5 * 3 - 5 + 4);
}

#[test]
fn move_round_trip_costs_twice_the_path() {
    let mut state = session(2, 100, 0);
    let (a, c) = (id(&state, "Brackwater"), id(&state, "Coldharbour"));
    state.place_units(a, 0, 5);
    let path = path_cost(state.map(), a, c, |_| true).unwrap();

    let there = orders(ALICE, &["M Brackwater Coldharbour 0 4"]);
    execute_orders(&mut state, &there, &mut ScriptedDice::fixed(1, 1));
    let back = orders(ALICE, &["M Coldharbour Brackwater 0 4"]);
    execute_orders(&mut state, &back, &mut ScriptedDice::fixed(1, 1));

    assert_eq!(state.player(ALICE).unwrap().food(), 100 - 2 * path * 4);
    assert_eq!(state.territory(a).units.count(0), 5);
    assert_eq!(state.territory(c).units.total(), 0);
}

#[test]
fn combat_is_deterministic_under_scripted_dice() {
    let mut first = session(2, 50, 0);
    first.place_units(id(&first, "Coldharbour"), 0, 6);
    first.place_units(id(&first, "Coldharbour"), 2, 2);
    first.place_units(id(&first, "Eastmarch"), 0, 4);
    first.place_units(id(&first, "Eastmarch"), 1, 3);
    let mut second = first.clone();

    let queue = orders(ALICE, &["A Coldharbour Eastmarch 0 6", "A Coldharbour Eastmarch 2 2"]);
    let rolls = vec![7, 12, 15, 3, 9, 9, 20, 2, 4, 18, 11, 6];
    let a = execute_orders(&mut first, &queue, &mut ScriptedDice::new(rolls.clone()));
    let b = execute_orders(&mut second, &queue, &mut ScriptedDice::new(rolls));

    assert_eq!(a, b);
    let east = id(&first, "Eastmarch");
    assert_eq!(first.territory(east).owner(), second.territory(east).owner());
    assert_eq!(first.territory(east).units, second.territory(east).units);
}

#[test]
fn tech_upgrade_only_usable_next_round() {
    let mut state = session(2, 0, 500);
    state.place_units(id(&state, "Ashford"), 0, 3);

    let round_one = orders(ALICE, &["T", "U Ashford 0 2 1"]);
    let report = execute_orders(&mut state, &round_one, &mut ScriptedDice::fixed(1, 1));
    // UpgradeUnit runs before TechUpgrade, so the unit order comes first.
    assert_eq!(
        rejection(&report, 0),
        Some(&RejectReason::AboveTechLevel { level: 2, max: 1 })
    );
    assert_eq!(rejection(&report, 1), None);
    assert_eq!(state.player(ALICE).unwrap().max_tech_level(), 1);

    settle(&mut state);
    assert_eq!(state.player(ALICE).unwrap().max_tech_level(), 2);

    let round_two = orders(ALICE, &["U Ashford 0 2 1"]);
    let report = execute_orders(&mut state, &round_two, &mut ScriptedDice::fixed(1, 1));
    assert_eq!(report.applied(), 1);
    assert_eq!(state.territory(id(&state, "Ashford")).units.count(2), 1);
}

#[test]
fn only_one_tech_upgrade_per_round() {
    let mut state = session(2, 0, 1000);
    let report = execute_orders(&mut state, &orders(ALICE, &["T", "T"]), &mut ScriptedDice::fixed(1, 1));
    assert_eq!(rejection(&report, 0), None);
    assert_eq!(rejection(&report, 1), Some(&RejectReason::AlreadyUpgrading));
    assert_eq!(state.player(ALICE).unwrap().tech(), 1000 - 50);

    settle(&mut state);
    assert_eq!(state.player(ALICE).unwrap().max_tech_level(), 2);
}

#[test]
fn tech_stops_at_the_ceiling() {
    let mut state = session(2, 0, 10_000);
    for _ in 0..8 {
        execute_orders(&mut state, &orders(ALICE, &["T"]), &mut ScriptedDice::fixed(1, 1));
        settle(&mut state);
    }
    let alice = state.player(ALICE).unwrap();
    assert_eq!(alice.max_tech_level(), MAX_LEVEL);
    assert_eq!(alice.tech(), 10_000 - (50 + 75 + 125 + 200 + 300) + 8 * 6);

    let report = execute_orders(&mut state, &orders(ALICE, &["T"]), &mut ScriptedDice::fixed(1, 1));
    assert_eq!(rejection(&report, 0), Some(&RejectReason::MaxTechLevel));
}

#[test]
fn unit_upgrades_are_monotonic_and_bounded() {
    for from in 0..MAX_LEVEL {
        let mut last = 0;
        for to in from + 1..=MAX_LEVEL {
            let cost = upgrade_cost(from, to, 1).unwrap();
            assert!(cost > last);
            last = cost;
        }
    }

    let mut state = session(2, 0, 1000);
    state.place_units(id(&state, "Ashford"), 1, 2);
    let report = execute_orders(
        &mut state,
        &orders(ALICE, &["U Ashford 1 0 1", "U Ashford 1 1 1", "U Ashford 1 4 1"]),
        &mut ScriptedDice::fixed(1, 1),
    );
    assert_eq!(rejection(&report, 0), Some(&RejectReason::InvalidUpgrade { from: 1, to: 0 }));
    assert_eq!(rejection(&report, 1), Some(&RejectReason::InvalidUpgrade { from: 1, to: 1 }));
    assert_eq!(
        rejection(&report, 2),
        Some(&RejectReason::AboveTechLevel { level: 4, max: 1 })
    );
    assert_eq!(state.player(ALICE).unwrap().tech(), 1000);
}

#[test]
fn alliances_need_both_sides_in_the_same_round() {
    let mut state = session(3, 0, 0);

    let one_sided = orders(ALICE, &["FA bob"]);
    let report = execute_orders(&mut state, &one_sided, &mut ScriptedDice::fixed(1, 1));
    assert_eq!(rejection(&report, 0), Some(&RejectReason::NotReciprocated("bob".to_string())));
    assert!(!state.are_allied(ALICE, BOB));

    let mut both = orders(ALICE, &["FA bob"]);
    both.extend(orders(BOB, &["FA alice"]));
    both.extend(orders(CAROL, &["FA carol"]));
    let report = execute_orders(&mut state, &both, &mut ScriptedDice::fixed(1, 1));
    assert_eq!(report.applied(), 2);
    assert_eq!(rejection(&report, 2), Some(&RejectReason::SelfAlliance));
    assert!(state.are_allied(ALICE, BOB) && state.are_allied(BOB, ALICE));
    assert!(!state.are_allied(ALICE, CAROL));
}

#[test]
fn alliances_are_off_with_two_players() {
    let mut state = session(2, 0, 0);
    let mut queue = orders(ALICE, &["FA bob"]);
    queue.extend(orders(BOB, &["FA alice"]));
    let report = execute_orders(&mut state, &queue, &mut ScriptedDice::fixed(1, 1));
    assert_eq!(report.applied(), 0);
    assert_eq!(rejection(&report, 0), Some(&RejectReason::AlliancesDisabled));
    assert!(!state.are_allied(ALICE, BOB));
}

#[test]
fn allies_may_move_through_each_other() {
    let mut state = session(3, 100, 0);
    state.form_alliance(ALICE, BOB);
    state.place_units(id(&state, "Coldharbour"), 0, 4);

    // Coldharbour -> Dunmore crosses bob's border.
    let report = execute_orders(
        &mut state,
        &orders(ALICE, &["M Coldharbour Dunmore 0 2"]),
        &mut ScriptedDice::fixed(1, 1),
    );
    assert_eq!(report.applied(), 1);
    let dunmore = state.territory(id(&state, "Dunmore"));
    assert_eq!(dunmore.owner(), Some(BOB));
    assert_eq!(dunmore.units_of(ALICE).count(0), 2);
    assert_eq!(state.unit_total(ALICE), 4);
}

#[test]
fn last_player_standing_wins_at_settlement() {
    let mut state = session(2, 50, 0);
    state.place_units(id(&state, "Eastmarch"), 0, 10);
    for name in ["Ashford", "Brackwater"] {
        let t = id(&state, name);
        state.set_owner(t, Some(BOB));
    }

    let report = execute_orders(
        &mut state,
        &orders(BOB, &["A Eastmarch Coldharbour 0 5"]),
        &mut ScriptedDice::fixed(20, 1),
    );
    assert!(report.battles[0].conquered);
    // Alice owns nothing now but is only marked out at settlement.
    assert!(state.player(ALICE).unwrap().alive);
    assert_eq!(state.winner(), Some(BOB));

    let settlement = settle(&mut state);
    assert_eq!(settlement.eliminated, vec![ALICE]);
    assert_eq!(settlement.winner, Some(BOB));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever orders are played, every territory has at most one owner
    /// and the owners' territory sets partition the owned territories.
    #[test]
    fn ownership_stays_partitioned(
        seed in any::<u64>(),
        script in prop::collection::vec((0usize..3, 0usize..9, 0usize..9, 0u8..3, 1u32..6), 0..40),
    ) {
        let mut state = session(3, 200, 200);
        for t in 0..9 {
            state.place_units(TerritoryId(t), 0, 4);
        }
        let names: Vec<String> = state.territories().iter().map(|t| t.name.clone()).collect();
        let mut dice = RngDice(SmallRng::seed_from_u64(seed));

        for round in script.chunks(6) {
            let queue: Vec<Order> = round
                .iter()
                .map(|&(player, src, dst, kind, count)| {
                    let player = PlayerId(player);
                    let (source, dest) = (names[src].clone(), names[dst].clone());
                    match kind {
                        0 => Order::Attack { player, source, dest, level: 0, count },
                        1 => Order::Move { player, source, dest, level: 0, count },
                        _ => Order::Alliance { player, target: ["alice", "bob", "carol"][dst % 3].to_string() },
                    }
                })
                .collect();
            execute_orders(&mut state, &queue, &mut dice);
            prop_assert!(state.ownership_is_consistent());
            settle(&mut state);
            prop_assert!(state.ownership_is_consistent());
            for p in state.players() {
                prop_assert_eq!(p.alive, !p.territories().is_empty());
            }
        }
    }
}
