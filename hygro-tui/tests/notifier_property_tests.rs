//! Status notifier timing on virtual time, plus model properties the
//! client relies on.

use hygro_core::influx;
use hygro_test_utils::assertions::{assert_hidden, assert_showing};
use hygro_test_utils::generators::{
    arb_sensor_client, arb_status_updates, arb_valid_device_config,
};
use hygro_test_utils::{manual_notifier, DisplayCall, Severity, AUTO_CLEAR_DELAY};
use proptest::prelude::*;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn busy_then_done_clears_from_the_second_update() {
    let (mut notifier, display, clock) = manual_notifier();
    notifier.notify_busy("Busy");
    clock.drive(&mut notifier, ms(100));
    notifier.notify_ok("Done");
    assert_eq!(clock.outstanding(), 1);

    assert_eq!(clock.drive(&mut notifier, ms(4_999)), 0);
    assert_showing(&display, "Done", Severity::Ok);
    assert_eq!(clock.drive(&mut notifier, ms(1)), 1);
    assert_hidden(&display);
    assert_eq!(clock.now(), ms(5_100));
}

#[test]
fn two_quick_updates_fire_exactly_once() {
    let (mut notifier, display, clock) = manual_notifier();
    notifier.notify_ok("A");
    clock.drive(&mut notifier, ms(2_000));
    notifier.notify_err("B");

    assert_eq!(clock.drive(&mut notifier, ms(4_999)), 0);
    assert_showing(&display, "B", Severity::Err);
    assert_eq!(clock.drive(&mut notifier, ms(10_000)), 1);
    assert_eq!(
        display.calls(),
        vec![
            DisplayCall::Show {
                text: "A".into(),
                style_class: "st-ok".into()
            },
            DisplayCall::Show {
                text: "B".into(),
                style_class: "st-err".into()
            },
            DisplayCall::Hide,
        ]
    );
}

#[test]
fn clearing_cancels_pending_timer() {
    let (mut notifier, display, clock) = manual_notifier();
    notifier.notify_warn("careful");
    notifier.clear_status();
    assert_hidden(&display);
    assert_eq!(clock.outstanding(), 0);
    assert_eq!(clock.drive(&mut notifier, AUTO_CLEAR_DELAY * 2), 0);
    assert_eq!(display.call_count(), 2);
}

proptest! {
    #[test]
    fn last_update_wins_then_auto_clears(updates in arb_status_updates()) {
        let (mut notifier, display, clock) = manual_notifier();
        for (delay, text, severity) in &updates {
            clock.drive(&mut notifier, ms(*delay));
            notifier.set_status(text.clone(), *severity);
            prop_assert!(clock.outstanding() <= 1);
        }

        let (_, text, severity) = updates.last().unwrap();
        prop_assert_eq!(notifier.message(), text.as_str());
        if text.is_empty() {
            assert_hidden(&display);
            prop_assert_eq!(clock.outstanding(), 0);
        } else {
            assert_showing(&display, text, *severity);
            prop_assert_eq!(clock.outstanding(), 1);
        }

        let cleared = clock.drive(&mut notifier, AUTO_CLEAR_DELAY);
        prop_assert_eq!(cleared, usize::from(!text.is_empty()));
        assert_hidden(&display);
        prop_assert_eq!(notifier.severity(), if text.is_empty() { *severity } else { Severity::None });
    }

    #[test]
    fn preview_exists_only_with_readings(
        config in arb_valid_device_config(),
        sensor in arb_sensor_client(),
    ) {
        let line = influx::preview(&config, &sensor);
        prop_assert_eq!(line.is_some(), sensor.reading().is_some());
        if let Some(line) = line {
            let expected_prefix = format!("{},type=bt,id={},", config.ifx_db, sensor.addr);
            prop_assert!(line.starts_with(&expected_prefix));
            prop_assert!(line.contains(" temperature="));
        }
    }

    #[test]
    fn valid_configs_survive_json(config in arb_valid_device_config()) {
        let json = config.to_json().unwrap();
        let back = hygro_core::DeviceConfig::from_json(&json).unwrap();
        prop_assert!(back.validate().is_ok());
        prop_assert_eq!(back, config);
    }
}
