mod common;

mod tests {
    use embassy_futures::block_on;
    use embassy_futures::select::select;
    use embassy_time::{Duration, Timer};

    use crate::common::{engine, engine_at};
    use myrtio_an30259a::{Channel, Command, CommandChannel, Controller, Outcome};

    #[test]
    fn test_execute_under_lock() {
        let controller = Controller::new(engine());
        let outcome = block_on(controller.execute(Command::ApplyPattern(5)));
        assert_eq!(outcome, Ok(Outcome::Applied));

        let engine = block_on(controller.lock());
        assert!(engine.registers().is_enabled(Channel::Green));
    }

    #[test]
    fn test_brightness_requests_coalesce() {
        let controller = Controller::new(engine());
        controller.request_brightness(Channel::Red, 10);
        controller.request_brightness(Channel::Red, 255);
        block_on(controller.apply_pending_brightness()).unwrap();

        let engine = block_on(controller.lock());
        assert_eq!(engine.registers().current(Channel::Red), 0x28);
        // One commit, two bus writes
        assert_eq!(engine.bus().writes.len(), 2);
    }

    #[test]
    fn test_nothing_pending_writes_nothing() {
        let controller = Controller::new(engine());
        block_on(controller.apply_pending_brightness()).unwrap();
        assert!(block_on(controller.lock()).bus().writes.is_empty());
    }

    #[test]
    fn test_brightness_loop_writes_then_stops() {
        let controller = Controller::new(engine());
        controller.request_brightness(Channel::Blue, 255);
        controller.shutdown();
        block_on(controller.run_brightness(Channel::Blue));

        let engine = block_on(controller.lock());
        assert!(engine.registers().is_enabled(Channel::Blue));
    }

    #[test]
    fn test_command_loop_drains_then_stops() {
        static COMMANDS: CommandChannel = CommandChannel::new();

        let controller = Controller::new(engine());
        COMMANDS.try_send(Command::SetFade(true)).unwrap();
        COMMANDS.try_send(Command::ApplyPattern(3)).unwrap();
        controller.shutdown();
        block_on(controller.run_commands(COMMANDS.receiver()));

        let engine = block_on(controller.lock());
        assert!(engine.settings().fade());
        assert_eq!(engine.registers().control(Channel::Blue, 0), 0xEF);
    }

    #[test]
    fn test_restriction_timer_stops_while_idle() {
        let controller = Controller::new(engine());
        controller.shutdown();
        block_on(controller.run_restriction_timer());
    }

    #[test]
    fn test_restriction_command_arms_timer() {
        let controller = Controller::new(engine_at(23));
        let outcome = block_on(controller.execute(Command::SetRestrictionWindow {
            start: 22,
            stop: 6,
        }));
        assert_eq!(outcome, Ok(Outcome::Applied));
        assert!(block_on(controller.lock()).is_restricted());

        // Re-arming is harmless
        controller.arm_restriction_timer();
        controller.arm_restriction_timer();
    }

    #[test]
    fn test_set_restriction_window_suppresses_later_patterns() {
        let controller = Controller::new(engine_at(2));
        block_on(controller.set_restriction_window(22, 6)).unwrap();
        let outcome = block_on(controller.execute(Command::ApplyPattern(1)));
        assert_eq!(outcome, Ok(Outcome::Suppressed));
    }

    #[test]
    fn test_restriction_timer_replays_once_then_idles() {
        let period = Duration::from_millis(20);
        let controller = Controller::with_check_period(engine_at(23), period);
        block_on(async {
            controller.set_restriction_window(22, 6).await.unwrap();
            let outcome = controller.execute(Command::ApplyPattern(1)).await;
            assert_eq!(outcome, Ok(Outcome::Suppressed));
        });
        let writes = block_on(controller.lock()).bus().writes.len();
        block_on(controller.lock()).clock_mut().hour = 6;

        let driver = async {
            // Arming an armed timer adds no extra evaluation
            controller.arm_restriction_timer();
            controller.arm_restriction_timer();
            Timer::after(period * 3 + period / 2).await;
            {
                let mut engine = controller.lock().await;
                assert!(engine.registers().is_enabled(Channel::Red));
                assert!(engine.saved().is_empty());
                // Exactly one replay: one config block and one enable byte
                assert_eq!(engine.bus().writes.len(), writes + 2);
                assert!(engine.clock_mut().reads >= 2);
                engine.set_restriction_window(-1, -1).unwrap();
            }

            Timer::after(period * 2).await;
            let reads = controller.lock().await.clock_mut().reads;
            Timer::after(period * 3).await;
            let mut engine = controller.lock().await;
            // Window unset: the loop waits for arming instead of polling
            assert_eq!(engine.clock_mut().reads, reads);
            assert_eq!(engine.bus().writes.len(), writes + 2);
            drop(engine);
            controller.shutdown();
        };
        block_on(select(controller.run_restriction_timer(), driver));

        // Shutdown also stops a loop that is waiting to be armed
        block_on(controller.run_restriction_timer());
    }
}
