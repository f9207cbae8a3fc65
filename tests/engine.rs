mod common;

mod tests {
    use crate::common::{BusFault, MockBus, MockClock, Write, engine, engine_at};
    use myrtio_an30259a::register::reg;
    use myrtio_an30259a::{
        BlinkRequest, Channel, Engine, EngineConfig, Error, LedCommandMode, Outcome, Pattern, Rgb,
        SlopeProfile,
    };

    #[test]
    fn test_fully_charged_end_to_end() {
        let mut engine = engine();
        assert_eq!(engine.apply_named_pattern(5), Ok(Outcome::Applied));

        let image = engine.registers();
        assert!(image.is_enabled(Channel::Green));
        assert!(!image.is_enabled(Channel::Red));
        assert!(!image.is_enabled(Channel::Blue));
        assert_eq!(image.current(Channel::Green), 0x28);
        for channel in Channel::ALL {
            assert!(!image.is_slope_mode(channel));
        }
    }

    #[test]
    fn test_commit_writes_config_block_then_enable_byte() {
        let mut engine = engine();
        engine.apply_pattern(Pattern::FullyCharged).unwrap();

        let writes = &engine.bus().writes;
        assert_eq!(writes.len(), 2);
        let Write::Block { start, data } = &writes[0] else {
            panic!("expected block write first");
        };
        assert_eq!(*start, reg::SEL);
        assert_eq!(data.as_slice(), engine.registers().config_block());
        assert_eq!(
            writes[1],
            Write::Byte {
                address: reg::LEDON,
                value: 0x02
            }
        );
        assert_eq!(&engine.bus().chip, engine.registers().as_bytes());
    }

    #[test]
    fn test_off_twice_matches_off_once() {
        let mut engine = engine();
        engine.apply_pattern(Pattern::Powering).unwrap();
        engine.apply_named_pattern(0).unwrap();
        let once = *engine.registers();
        engine.apply_named_pattern(0).unwrap();
        assert_eq!(*engine.registers(), once);
    }

    #[test]
    fn test_unknown_pattern_is_ignored() {
        let mut engine = engine();
        engine.apply_pattern(Pattern::Charging).unwrap();
        let before = *engine.registers();
        let writes = engine.bus().writes.len();

        assert_eq!(engine.apply_named_pattern(7), Ok(Outcome::Ignored));
        assert_eq!(engine.apply_named_pattern(-1), Ok(Outcome::Ignored));
        assert_eq!(engine.apply_named_pattern(1000), Ok(Outcome::Ignored));
        assert_eq!(*engine.registers(), before);
        assert_eq!(engine.bus().writes.len(), writes);
    }

    #[test]
    fn test_custom_blink_red_only() {
        let mut engine = engine();
        engine.apply_pattern(Pattern::MissedNotification).unwrap();
        engine.set_custom_blink(0x00FF_0000, 500, 2000).unwrap();

        let image = engine.registers();
        assert!(image.is_enabled(Channel::Red));
        assert!(image.is_slope_mode(Channel::Red));
        assert!(!image.is_enabled(Channel::Green));
        assert!(!image.is_enabled(Channel::Blue));

        let slope = SlopeProfile::read(image, Channel::Red, 4);
        assert_eq!((slope.total_1, slope.total_2), (1, 4));
        assert_eq!(slope.steps, [0; 4]);
        assert_eq!((slope.duty_max, slope.duty_mid, slope.duty_min), (15, 15, 0));
        // Single commit for the whole colour
        assert_eq!(engine.bus().writes.len(), 4);
    }

    #[test]
    fn test_custom_blink_clamps_long_on_time() {
        let mut engine = engine();
        engine.set_custom_blink(0x0000_00FF, 999_999, 500).unwrap();
        let slope = SlopeProfile::read(engine.registers(), Channel::Blue, 4);
        assert_eq!(slope.total_1, 15);
        assert_eq!(slope.total_2, 1);
    }

    #[test]
    fn test_channel_brightness_zero_and_full() {
        let mut engine = engine();
        engine.set_channel_brightness(Channel::Red, 255).unwrap();
        assert!(engine.registers().is_enabled(Channel::Red));
        assert_eq!(engine.registers().current(Channel::Red), 0x28);

        engine.set_channel_brightness(Channel::Red, 0).unwrap();
        assert!(!engine.registers().is_enabled(Channel::Red));
    }

    #[test]
    fn test_channel_brightness_ignores_restriction() {
        let mut engine = engine_at(23);
        engine.set_restriction_window(22, 6).unwrap();
        engine.set_channel_brightness(Channel::Green, 255).unwrap();
        assert!(engine.registers().is_enabled(Channel::Green));
    }

    #[test]
    fn test_suppressed_pattern_replays_once() {
        let mut engine = engine_at(23);
        engine.set_restriction_window(22, 6).unwrap();
        assert!(engine.is_restricted());

        let before = *engine.registers();
        assert_eq!(engine.apply_named_pattern(1), Ok(Outcome::Suppressed));
        assert_eq!(*engine.registers(), before);
        assert_eq!(engine.saved().pattern(), Some(Pattern::Charging));

        engine.clock_mut().hour = 6;
        assert_eq!(engine.refresh_restrictions(), Ok(false));
        assert!(engine.registers().is_enabled(Channel::Red));
        assert!(engine.saved().is_empty());
        let writes = engine.bus().writes.len();

        engine.clock_mut().hour = 7;
        assert_eq!(engine.refresh_restrictions(), Ok(false));
        assert_eq!(engine.bus().writes.len(), writes);
    }

    #[test]
    fn test_entering_restriction_turns_outputs_off() {
        let mut engine = engine_at(21);
        engine.set_restriction_window(22, 6).unwrap();
        engine.apply_pattern(Pattern::FullyCharged).unwrap();

        engine.clock_mut().hour = 22;
        assert_eq!(engine.refresh_restrictions(), Ok(true));
        assert!(!engine.registers().any_enabled());
        assert_eq!(engine.bus().chip[reg::LEDON as usize], 0);
    }

    #[test]
    fn test_still_blocked_is_quiet_when_dark() {
        let mut engine = engine_at(23);
        engine.set_restriction_window(22, 6).unwrap();
        let writes = engine.bus().writes.len();

        engine.clock_mut().hour = 2;
        assert_eq!(engine.refresh_restrictions(), Ok(true));
        assert_eq!(engine.bus().writes.len(), writes);
    }

    #[test]
    fn test_replay_order_pattern_then_blinks() {
        let mut engine = engine_at(23);
        engine.set_restriction_window(22, 6).unwrap();
        engine
            .set_blink(Channel::Green, BlinkRequest::new(500, 500, 255))
            .unwrap();
        engine.apply_pattern(Pattern::LowBattery).unwrap();

        engine.clock_mut().hour = 8;
        engine.refresh_restrictions().unwrap();

        let image = engine.registers();
        // The pattern reset would have cleared green had it run second
        assert!(image.is_enabled(Channel::Red));
        assert!(image.is_enabled(Channel::Green));
    }

    #[test]
    fn test_suppressed_stop_blink_clears_saved_slot() {
        let mut engine = engine_at(23);
        engine.set_restriction_window(22, 6).unwrap();
        engine
            .set_blink(Channel::Blue, BlinkRequest::new(500, 500, 100))
            .unwrap();
        assert!(engine.saved().blink(Channel::Blue).is_some());

        assert_eq!(
            engine.set_blink(Channel::Blue, BlinkRequest::new(500, 500, 0)),
            Ok(Outcome::Suppressed)
        );
        assert!(engine.saved().blink(Channel::Blue).is_none());
    }

    #[test]
    fn test_suppressed_custom_blink_saves_off_and_components() {
        let mut engine = engine_at(23);
        engine.set_restriction_window(22, 6).unwrap();
        engine.set_custom_blink(0x0011_0022, 500, 1000).unwrap();

        let saved = engine.saved();
        assert_eq!(saved.pattern(), Some(Pattern::Off));
        assert_eq!(saved.blink(Channel::Red), Some(BlinkRequest::new(500, 1000, 0x11)));
        assert_eq!(saved.blink(Channel::Green), None);
        assert_eq!(saved.blink(Channel::Blue), Some(BlinkRequest::new(500, 1000, 0x22)));
    }

    #[test]
    fn test_kill_switch_suppresses_and_releases() {
        let mut engine = engine();
        engine.apply_pattern(Pattern::Charging).unwrap();

        engine.set_always_disabled(true).unwrap();
        assert!(!engine.registers().any_enabled());
        assert_eq!(
            engine.apply_pattern(Pattern::FullyCharged),
            Ok(Outcome::Suppressed)
        );

        engine.set_always_disabled(false).unwrap();
        assert!(engine.registers().is_enabled(Channel::Green));
        assert!(!engine.is_restricted());
    }

    #[test]
    fn test_invalid_window_leaves_state_unchanged() {
        let mut engine = engine();
        engine.set_restriction_window(22, 6).unwrap();
        assert_eq!(engine.set_restriction_window(24, 6), Err(Error::InvalidInput));
        assert_eq!(engine.settings().window().start(), Some(22));
        assert_eq!(engine.settings().window().stop(), Some(6));
    }

    #[test]
    fn test_step_bit_shift_errors() {
        let mut engine = engine();
        assert_eq!(engine.set_step_bit_shift(8), Err(Error::Configuration));
        assert_eq!(engine.set_step_bit_shift(2), Err(Error::InvalidInput));
        assert_eq!(engine.settings().step_timing().shift(), 4);
    }

    #[test]
    fn test_transport_failure_keeps_image() {
        let mut engine = engine();
        engine.bus_mut().fail = true;
        assert_eq!(
            engine.apply_pattern(Pattern::FullyCharged),
            Err(Error::Transport(BusFault))
        );
        assert!(engine.registers().is_enabled(Channel::Green));

        engine.bus_mut().fail = false;
        engine.apply_pattern(Pattern::FullyCharged).unwrap();
        assert_eq!(&engine.bus().chip, engine.registers().as_bytes());
    }

    #[test]
    fn test_init_resets_and_reads_back() {
        let mut bus = MockBus::new();
        bus.chip[reg::LED1CC as usize] = 0x33;
        bus.chip[reg::LEDON as usize] = 0x07;
        let mut engine = Engine::new(bus, MockClock::at(0), &EngineConfig::default());
        engine.init().unwrap();

        assert_eq!(
            engine.bus().writes,
            vec![
                Write::Byte {
                    address: reg::SRESET,
                    value: 0x01
                },
                Write::Byte {
                    address: reg::SEL,
                    value: 0x00
                },
            ]
        );
        assert_eq!(engine.registers().enable_register(), 0);
        assert_eq!(engine.registers().imax(), 0);
    }

    #[test]
    fn test_current_imax() {
        let mut engine = engine();
        engine.set_current_imax(2).unwrap();
        assert_eq!(engine.registers().imax(), 2);
        assert_eq!(engine.bus().chip[reg::SEL as usize], 0x80);
        assert_eq!(engine.set_current_imax(4), Err(Error::InvalidInput));
    }

    #[test]
    fn test_read_back_does_not_touch_image() {
        let mut engine = engine();
        engine.bus_mut().chip[reg::LED1CC as usize] = 0x42;
        let bytes = engine.read_back().unwrap();
        assert_eq!(bytes[reg::LED1CC as usize], 0x42);
        assert_eq!(engine.registers().current(Channel::Red), 0);
    }

    #[test]
    fn test_solid_color_mode_uses_raw_currents() {
        let mut engine = engine();
        let outcome = engine
            .apply_mode(LedCommandMode::SolidColor(Rgb { r: 0x10, g: 0, b: 0x30 }))
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);

        let image = engine.registers();
        assert_eq!(image.enable_register(), 0x05);
        assert_eq!(image.current(Channel::Red), 0x10);
        assert_eq!(image.current(Channel::Blue), 0x30);
        assert_eq!(engine.bus().writes.len(), 2);
    }

    #[test]
    fn test_fade_setting_changes_next_blink() {
        let mut engine = engine();
        engine.set_fade_enabled(true);
        engine
            .apply_mode(LedCommandMode::CustomBlink {
                channel: Channel::Red,
                request: BlinkRequest::new(500, 500, 255),
            })
            .unwrap();
        assert_eq!(engine.registers().control(Channel::Red, 0), 0xEF);
    }

    #[test]
    fn test_solid_color_waits_for_kill_switch() {
        let mut engine = engine();
        engine.set_always_disabled(true).unwrap();

        let outcome = engine.apply_mode(LedCommandMode::SolidColor(Rgb { r: 0x20, g: 0, b: 0 }));
        assert_eq!(outcome, Ok(Outcome::Suppressed));
        assert!(!engine.registers().is_enabled(Channel::Red));
        assert_eq!(engine.bus().chip[reg::LEDON as usize], 0);
        assert_eq!(engine.saved().solid(), Some(Rgb { r: 0x20, g: 0, b: 0 }));

        engine.set_always_disabled(false).unwrap();
        assert!(engine.registers().is_enabled(Channel::Red));
        assert_eq!(engine.registers().current(Channel::Red), 0x20);
        assert!(engine.saved().is_empty());
    }

    #[test]
    fn test_solid_color_inside_window_replays_on_release() {
        let mut engine = engine_at(23);
        engine.set_restriction_window(22, 6).unwrap();
        let before = *engine.registers();

        let outcome = engine.apply_mode(LedCommandMode::SolidColor(Rgb { r: 0, g: 0x28, b: 0 }));
        assert_eq!(outcome, Ok(Outcome::Suppressed));
        assert_eq!(*engine.registers(), before);
        assert_eq!(engine.bus().chip[reg::LEDON as usize], 0);

        engine.clock_mut().hour = 6;
        engine.refresh_restrictions().unwrap();
        assert_eq!(engine.registers().enable_register(), 0x02);
        assert_eq!(engine.registers().current(Channel::Green), 0x28);
        assert_eq!(engine.bus().chip[reg::LEDON as usize], 0x02);
    }

    #[test]
    fn test_later_pattern_supersedes_saved_solid() {
        let mut engine = engine_at(23);
        engine.set_restriction_window(22, 6).unwrap();
        engine.apply_solid(Rgb { r: 0x10, g: 0x10, b: 0x10 }).unwrap();
        engine.apply_pattern(Pattern::Charging).unwrap();

        assert_eq!(engine.saved().solid(), None);
        assert_eq!(engine.saved().pattern(), Some(Pattern::Charging));
    }
}
