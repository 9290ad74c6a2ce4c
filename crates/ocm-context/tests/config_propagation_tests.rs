//! Integration tests for replaying the configuration log into consumers

mod common;

use common::*;
use ocm_context::config::{ConfigBundle, ConfigObject, ConfigSet, UpdateStatus};
use ocm_context::Error;

#[test]
fn test_late_target_catches_up() {
    let ctx = demo_context();
    let target = DemoTarget::new(&ctx);

    ctx.apply_config(ConfigObject::new(DemoConfig::new("hello world")), "first")
        .unwrap();
    assert_eq!(target.value(), "hello world");

    ctx.apply_data(demo_document("hello universe").as_bytes(), "second")
        .unwrap();
    assert_eq!(target.value(), "hello universe");

    let late = DemoTarget::new(&ctx);
    assert_eq!(late.value(), "hello universe");
    assert_eq!(late.applied(), 2);
}

#[test]
fn test_catch_up_is_idempotent() {
    let ctx = demo_context();
    let target = DemoTarget::new(&ctx);
    ctx.apply_config(ConfigObject::new(DemoConfig::new("once")), "once")
        .unwrap();

    assert_eq!(target.update().unwrap(), UpdateStatus::Updated);
    assert_eq!(target.update().unwrap(), UpdateStatus::UpToDate);
    assert_eq!(target.applied(), 1);

    let watermark = ctx.generation();
    let report = ctx.apply_to(watermark, target.as_ref());
    assert!(report.is_ok());
    assert_eq!(report.generation, watermark);
    let report = ctx.apply_to(watermark, target.as_ref());
    assert_eq!(report.generation, watermark);
    assert_eq!(target.applied(), 1);
}

#[test]
fn test_entries_apply_in_log_order() {
    let ctx = demo_context();
    for value in ["one", "two", "three"] {
        ctx.apply_config(ConfigObject::new(DemoConfig::new(value)), value)
            .unwrap();
    }

    let target = DemoTarget::new(&ctx);
    assert_eq!(target.value(), "three");
    assert_eq!(target.applied(), 3);
    assert_eq!(target.updater().state(), (3, false));
}

#[test]
fn test_failing_entry_does_not_block_later_entries() {
    let ctx = demo_context();
    let target = DemoTarget::new(&ctx);

    ctx.apply_config(ConfigObject::new(DemoConfig::new(FAILING_VALUE)), "broken entry")
        .unwrap();
    ctx.apply_config(ConfigObject::new(DemoConfig::new("after")), "good entry")
        .unwrap();

    let err = target.update().unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.starts_with("config apply errors:"));
    assert!(rendered.contains("broken entry: demo target refused value"));
    assert!(!rendered.contains("good entry"));

    assert_eq!(target.peek(), "after");
    assert_eq!(target.update().unwrap(), UpdateStatus::UpToDate);
}

#[test]
fn test_reset_hides_history_from_replay() {
    let ctx = demo_context();
    let target = DemoTarget::new(&ctx);
    ctx.apply_config(ConfigObject::new(DemoConfig::new("before")), "before")
        .unwrap();
    let _ = ctx.apply_data(b"type: unknown.kind/v1\n", "unknown before reset");

    let watermark = ctx.reset();
    assert_eq!(watermark, 2);

    let report = ctx.apply_to(watermark, target.as_ref());
    assert_eq!(report.generation, watermark);
    assert_eq!(target.applied(), 0);

    let late = DemoTarget::new(&ctx);
    assert_eq!(late.value(), "");

    let err = ctx.validate().unwrap_err();
    assert!(err.is_unknown_config_kind());
    assert!(err.to_string().contains("unknown before reset"));

    ctx.apply_config(ConfigObject::new(DemoConfig::new("after")), "after")
        .unwrap();
    assert_eq!(late.value(), "after");
    assert_eq!(late.applied(), 1);
}

#[test]
fn test_configs_applied_during_replay_are_picked_up() {
    let ctx = demo_context();
    let target = DemoTarget::new(&ctx);

    let mut bundle = ConfigBundle::new();
    bundle
        .add_config(&ConfigObject::new(DemoConfig::new("nested one")))
        .unwrap();
    bundle
        .add_config(&ConfigObject::new(DemoConfig::new("nested two")))
        .unwrap();
    ctx.apply_config(ConfigObject::new(bundle), "bundle").unwrap();

    assert_eq!(ctx.generation(), 3);
    assert_eq!(ctx.updater().state(), (3, false));
    assert_eq!(target.value(), "nested two");

    let descriptions: Vec<_> = ctx
        .entries()
        .iter()
        .map(|entry| entry.description().to_string())
        .collect();
    assert_eq!(
        descriptions,
        vec!["bundle", "bundle--generic config", "bundle--generic config"]
    );
}

#[test]
fn test_update_during_update_is_rejected() {
    let ctx = demo_context();
    let target = DemoTarget::new(&ctx);

    ctx.apply_config(ConfigObject::new(DemoConfig::new(REENTER_VALUE)), "reenter")
        .unwrap();
    ctx.apply_config(ConfigObject::new(DemoConfig::new("done")), "done")
        .unwrap();

    assert_eq!(target.value(), "done");
    assert_eq!(target.nested_updates(), vec![UpdateStatus::Reentrant]);
    assert_eq!(target.updater().state(), (2, false));
}

#[test]
fn test_config_sets() {
    let ctx = demo_context();
    let target = DemoTarget::new(&ctx);

    let mut set = ConfigSet::new("greetings");
    set.add(ConfigObject::new(DemoConfig::new("hello")));
    set.add(ConfigObject::new(DemoConfig::new("hi")));
    ctx.add_config_set("greetings", set);

    assert_eq!(ctx.generation(), 0);
    ctx.apply_config_set("greetings").unwrap();
    assert_eq!(ctx.generation(), 2);
    assert_eq!(target.value(), "hi");
    assert!(ctx
        .entries()
        .iter()
        .all(|entry| entry.description() == "config set greetings"));

    let err = ctx.apply_config_set("farewells").unwrap_err();
    assert!(matches!(err, Error::UnknownConfigSet { .. }));
}

#[test]
fn test_targets_are_not_kept_alive() {
    let ctx = demo_context();
    let target = DemoTarget::new(&ctx);
    let detached = DemoTarget::new(&ctx);
    let updater_state = detached.updater().state();
    drop(detached);

    ctx.apply_config(ConfigObject::new(DemoConfig::new("still works")), "entry")
        .unwrap();
    assert_eq!(target.value(), "still works");
    assert_eq!(updater_state, (0, false));
}

#[test]
fn test_updater_detaches_from_dropped_context() {
    let ctx = demo_context();
    let target = DemoTarget::new(&ctx);
    ctx.apply_config(ConfigObject::new(DemoConfig::new("last words")), "entry")
        .unwrap();
    drop(ctx);

    assert_eq!(target.update().unwrap(), UpdateStatus::Detached);
    assert_eq!(target.peek(), "");
}
