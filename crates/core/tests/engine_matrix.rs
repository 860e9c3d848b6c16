use proptest::prelude::*;
use restrack_core::{
    apply_caps, evaluate_trigger, BuffDef, BuffEffect, CardCost, CardDef, ChangeType, Condition,
    ConditionOperator, EffectPhase, EngineError, EntityKind, EntityRef, Event, EventBus,
    NumericEntity, Trigger, TriggerLogic, WorldState,
};

fn gold() -> EntityRef {
    EntityRef::resource("Gold")
}

fn world_with(entities: Vec<(EntityKind, NumericEntity)>) -> WorldState {
    let mut world = WorldState::default();
    for (kind, entity) in entities {
        world.add_entity(kind, entity).expect("add entity");
    }
    world
}

fn gold_value(world: &WorldState) -> f64 {
    world.value_of(&gold()).unwrap_or(f64::NAN)
}

fn card_id(world: &WorldState, name: &str) -> restrack_core::InstanceId {
    world
        .find_active_card(name)
        .map(|card| card.id)
        .unwrap_or_default()
}

/// `[true, false, true]` at turn one.
fn mixed_conditions() -> Vec<Condition> {
    vec![
        Condition::turn(ConditionOperator::AtLeast, 1),
        Condition::turn(ConditionOperator::AtLeast, 5),
        Condition::turn(ConditionOperator::Equal, 1),
    ]
}

macro_rules! truth_case {
    ($name:ident, $trigger:expr, $expected:expr) => {
        #[test]
        fn $name() {
            let world = WorldState::default();
            assert_eq!(evaluate_trigger(&$trigger, &world), $expected);
        }
    };
}

truth_case!(truth_all, Trigger::all(mixed_conditions()), false);
truth_case!(truth_any, Trigger::any(mixed_conditions()), true);
truth_case!(truth_at_least_two, Trigger::at_least(2, mixed_conditions()), true);
truth_case!(truth_at_least_three, Trigger::at_least(3, mixed_conditions()), false);
truth_case!(truth_empty_is_vacuous, Trigger::any(Vec::new()), true);
truth_case!(
    truth_custom_zero_means_two,
    Trigger {
        logic: TriggerLogic::Custom,
        custom_value: 0,
        conditions: mixed_conditions(),
    },
    true
);

#[test]
fn cyclical_counter_wraps_up_to_base() {
    let mut world = world_with(vec![(
        EntityKind::Resource,
        NumericEntity::new("Hour", 1.0)
            .with_change(1.0)
            .with_max(24.0, true)
            .cyclical_with(Vec::new())
            .with_current(24.0),
    )]);
    let mut events = EventBus::new();
    world.end_turn(&mut events);
    assert_eq!(world.value_of(&EntityRef::resource("Hour")), Some(1.0));
}

#[test]
fn cyclical_counter_wraps_down_to_max() {
    let mut world = world_with(vec![(
        EntityKind::Resource,
        NumericEntity::new("Hour", 24.0)
            .with_change(-1.0)
            .with_max(24.0, true)
            .cyclical_with(Vec::new())
            .with_current(1.0),
    )]);
    let mut events = EventBus::new();
    world.end_turn(&mut events);
    assert_eq!(world.value_of(&EntityRef::resource("Hour")), Some(24.0));
}

#[test]
fn one_time_buff_never_returns_while_its_trigger_holds() {
    let mut world = world_with(vec![(EntityKind::Resource, NumericEntity::new("Gold", 0.0))]);
    let mut events = EventBus::new();
    world
        .add_buff(
            BuffDef::new(
                "Windfall",
                Trigger::all(vec![Condition::turn(ConditionOperator::AtLeast, 1)]),
            )
            .once()
            .lasting(1)
            .with_effect(BuffEffect::flat(gold(), 10.0, EffectPhase::Immediate)),
            &mut events,
        )
        .expect("add buff");
    assert_eq!(gold_value(&world), 10.0);
    for _ in 0..5 {
        world.end_turn(&mut events);
        assert!(world.find_active_buff("Windfall").is_none());
    }
    let applied = events
        .iter()
        .filter(|event| matches!(event, Event::BuffApplied { name } if name == "Windfall"))
        .count();
    assert_eq!(applied, 1);
    assert_eq!(gold_value(&world), 0.0);

    world.reset_turn(&mut events);
    assert!(world.find_active_buff("Windfall").is_none());
}

#[test]
fn card_costing_ten_gold_needs_ten_gold() {
    let mut world = world_with(vec![(
        EntityKind::Resource,
        NumericEntity::new("Gold", 0.0).with_current(5.0),
    )]);
    let mut events = EventBus::new();
    world
        .add_card(
            CardDef::new("Trade", Trigger::always()).with_cost(CardCost::flat(gold(), 10.0)),
            &mut events,
        )
        .expect("add card");

    let id = card_id(&world, "Trade");
    assert_eq!(
        world.play_card(id, &mut events),
        Err(EngineError::CannotAfford("Trade".to_string()))
    );
    assert_eq!(gold_value(&world), 5.0);

    if let Some(entity) = world.entity_mut(&gold()) {
        entity.current_value = 10.0;
    }
    assert_eq!(world.play_card(id, &mut events), Ok(()));
    assert_eq!(gold_value(&world), 0.0);
}

#[test]
fn gold_income_stops_at_hard_cap() {
    let mut world = world_with(vec![(
        EntityKind::Resource,
        NumericEntity::new("Gold", 0.0)
            .with_change(5.0)
            .with_max(20.0, true),
    )]);
    let mut events = EventBus::new();
    for _ in 0..5 {
        world.end_turn(&mut events);
    }
    assert_eq!(gold_value(&world), 20.0);
    assert_eq!(world.current_turn, 6);
}

#[test]
fn percent_buff_reverses_exactly_after_hitting_a_cap() {
    let mut world = world_with(vec![(
        EntityKind::Resource,
        NumericEntity::new("Gold", 0.0)
            .with_max(20.0, true)
            .with_current(18.0),
    )]);
    let mut events = EventBus::new();
    world
        .add_buff(
            BuffDef::new("Boom", Trigger::always())
                .with_effect(BuffEffect::percent(gold(), 50.0, EffectPhase::Immediate)),
            &mut events,
        )
        .expect("add buff");
    assert_eq!(gold_value(&world), 20.0);
    // Something else moves gold before the buff ends.
    world.apply_raw_delta(&gold(), -10.0);
    assert!(world.clear_buff("Boom", &mut events));
    assert_eq!(gold_value(&world), 8.0);
}

#[test]
fn clear_buff_card_keeps_the_buff_down_until_reset() {
    let mut world = world_with(vec![(
        EntityKind::Stat,
        NumericEntity::new("Luck", 5.0),
    )]);
    let mut events = EventBus::new();
    world
        .add_buff(
            BuffDef::new("Curse", Trigger::always()).with_effect(BuffEffect::flat(
                EntityRef::stat("Luck"),
                -3.0,
                EffectPhase::Immediate,
            )),
            &mut events,
        )
        .expect("add buff");
    world
        .add_card(
            CardDef::new(
                "Cleanse",
                Trigger::all(vec![Condition::buff_active("Curse")]),
            )
            .clearing("Curse"),
            &mut events,
        )
        .expect("add card");
    assert_eq!(world.value_of(&EntityRef::stat("Luck")), Some(2.0));

    let id = card_id(&world, "Cleanse");
    world.play_card(id, &mut events).expect("play");
    assert_eq!(world.value_of(&EntityRef::stat("Luck")), Some(5.0));
    for _ in 0..3 {
        world.end_turn(&mut events);
        assert!(world.find_active_buff("Curse").is_none());
        assert!(world.find_active_card("Cleanse").is_none());
    }

    world.reset_turn(&mut events);
    assert!(world.find_active_buff("Curse").is_some());
    assert!(world.find_active_card("Cleanse").is_some());
}

#[test]
fn played_card_returns_on_the_next_turn() {
    let mut world = world_with(vec![(EntityKind::Resource, NumericEntity::new("Gold", 0.0))]);
    let mut events = EventBus::new();
    world
        .add_card(CardDef::new("Rest", Trigger::always()), &mut events)
        .expect("add card");
    let id = card_id(&world, "Rest");
    world.play_card(id, &mut events).expect("play");
    world.check_and_activate(&mut events);
    assert!(world.find_active_card("Rest").is_none());
    world.end_turn(&mut events);
    assert!(world.find_active_card("Rest").is_some());
}

#[test]
fn delayed_cost_creates_one_debuff_per_cost() {
    let mut world = world_with(vec![(
        EntityKind::Resource,
        NumericEntity::new("Gold", 0.0).with_current(100.0),
    )]);
    let mut events = EventBus::new();
    world
        .add_card(
            CardDef::new("Mortgage", Trigger::always())
                .with_cost(CardCost::flat(gold(), 2.0).over_turns(3)),
            &mut events,
        )
        .expect("add card");

    world
        .play_card(card_id(&world, "Mortgage"), &mut events)
        .expect("first play");
    assert_eq!(gold_value(&world), 100.0);
    world.end_turn(&mut events);
    assert_eq!(gold_value(&world), 98.0);
    world
        .play_card(card_id(&world, "Mortgage"), &mut events)
        .expect("second play");
    let debuffs = world
        .active_buffs
        .iter()
        .filter(|buff| buff.name == "Mortgage: Cost")
        .count();
    assert_eq!(debuffs, 1);

    world.end_turn(&mut events);
    assert_eq!(gold_value(&world), 96.0);
    world.end_turn(&mut events);
    assert!(world.find_active_buff("Mortgage: Cost").is_none());
    assert_eq!(gold_value(&world), 96.0);
}

#[test]
fn card_waiting_on_a_buff_appears_in_the_same_turn() {
    let mut world = world_with(vec![(EntityKind::Resource, NumericEntity::new("Gold", 0.0))]);
    let mut events = EventBus::new();
    world
        .add_card(
            CardDef::new("Shelter", Trigger::all(vec![Condition::buff_active("Storm")])),
            &mut events,
        )
        .expect("add card");
    world
        .add_buff(
            BuffDef::new(
                "Storm",
                Trigger::all(vec![Condition::turn(ConditionOperator::AtLeast, 2)]),
            ),
            &mut events,
        )
        .expect("add buff");
    assert!(world.find_active_card("Shelter").is_none());
    world.end_turn(&mut events);
    assert!(world.find_active_buff("Storm").is_some());
    assert!(world.find_active_card("Shelter").is_some());
}

#[derive(Debug, Clone)]
struct Step {
    percent: bool,
    value: f64,
}

fn step() -> impl Strategy<Value = Step> {
    (any::<bool>(), -5_000i64..5_000).prop_map(|(percent, cents)| Step {
        percent,
        value: cents as f64 / 100.0,
    })
}

proptest! {
    #[test]
    fn recorded_deltas_reverse_exactly(
        start in 0i64..100_000,
        max in proptest::option::of(0i64..100_000),
        buffs in proptest::collection::vec(proptest::collection::vec(step(), 1..4), 1..6),
    ) {
        let mut entity = NumericEntity::new("Gold", 0.0).with_current(start as f64 / 100.0);
        if let Some(max) = max {
            entity = entity.with_max(max as f64 / 100.0, true);
        }
        apply_caps(&mut entity);
        let mut world = world_with(vec![(EntityKind::Resource, entity)]);
        let mut events = EventBus::new();
        let before = gold_value(&world);

        for (index, steps) in buffs.iter().enumerate() {
            let mut def = BuffDef::new(format!("B{index}"), Trigger::always());
            for step in steps {
                let mut effect = BuffEffect::flat(gold(), step.value, EffectPhase::Immediate);
                if step.percent {
                    effect.effect_type = ChangeType::Percent;
                }
                def = def.with_effect(effect);
            }
            world.add_buff(def, &mut events).expect("add buff");
        }
        for index in (0..buffs.len()).rev() {
            let name = format!("B{}", index);
            prop_assert!(world.clear_buff(&name, &mut events));
        }
        prop_assert_eq!(gold_value(&world), before);
    }
}
