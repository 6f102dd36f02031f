//! Unit tests for the OSAL core
//!
//! These tests run on the host (not embedded target) against independent
//! `Osal` contexts driven by a manual clock.

#[cfg(test)]
mod common {
    use osal::port::ManualClock;
    use osal::{EventMask, Osal, TaskDef, TaskId};

    pub static CLOCK: ManualClock = ManualClock::new(1000);

    pub fn idle(_: &Osal<'_>, _: TaskId, _: EventMask) -> EventMask {
        0
    }

    pub static TASKS: [TaskDef; 3] = [
        TaskDef::new("t0", idle),
        TaskDef::new("t1", idle),
        TaskDef::new("t2", idle),
    ];

    /// Allocate a message whose event byte is `tag`
    pub fn tagged(osal: &Osal<'_>, tag: u8) -> osal::MsgPtr {
        let m = osal.msg_allocate(4).unwrap();
        osal.msg_write(m, &[tag]).unwrap();
        m
    }
}

#[cfg(test)]
mod msg_tests {
    use super::common::*;
    use osal::event::{MSG_EVENT_ANY, SYS_EVENT_MSG};
    use osal::{BusyPoll, Domain, MsgQueue, Osal, OsalError, CFG_MSG_POOL_SIZE};

    fn osal() -> Osal<'static> {
        let osal = Osal::new(&TASKS, &CLOCK, Domain::Standalone(&BusyPoll));
        osal.init_system().unwrap();
        osal
    }

    #[test]
    fn test_fifo_per_task() {
        let osal = osal();
        let msgs: Vec<_> = (0..5).map(|i| tagged(&osal, i)).collect();
        for &m in &msgs {
            osal.msg_send(1, m).unwrap();
        }
        // Interleave another destination
        osal.msg_send(2, tagged(&osal, 9)).unwrap();

        for &m in &msgs {
            assert_eq!(osal.msg_receive(1), Some(m));
            osal.msg_deallocate(m).unwrap();
        }
        assert_eq!(osal.msg_receive(1), None);
        assert_eq!(osal.msg_count(2, MSG_EVENT_ANY), 1);
    }

    #[test]
    fn test_push_front_goes_first() {
        let osal = osal();
        let m1 = tagged(&osal, 1);
        let m2 = tagged(&osal, 2);

        osal.msg_send(0, m1).unwrap();
        osal.msg_push_front(0, m2).unwrap();

        assert_eq!(osal.msg_receive(0), Some(m2));
        assert_eq!(osal.msg_receive(0), Some(m1));
    }

    #[test]
    fn test_free_of_queued_message_fails() {
        let osal = osal();
        let m = tagged(&osal, 1);
        osal.msg_send(0, m).unwrap();

        assert_eq!(osal.msg_deallocate(m), Err(OsalError::MsgBufferNotAvail));

        assert_eq!(osal.msg_receive(0), Some(m));
        assert_eq!(osal.msg_deallocate(m), Ok(()));
    }

    #[test]
    fn test_event_bit_tracks_remaining_messages() {
        let osal = osal();
        osal.msg_send(2, tagged(&osal, 1)).unwrap();
        osal.msg_send(2, tagged(&osal, 2)).unwrap();
        assert_eq!(osal.pending_events(2) & SYS_EVENT_MSG, SYS_EVENT_MSG);

        // Clear it the way the scheduler does before dispatch
        osal.clear_event(2, SYS_EVENT_MSG).unwrap();

        osal.msg_receive(2).unwrap();
        assert_eq!(osal.pending_events(2) & SYS_EVENT_MSG, SYS_EVENT_MSG);

        osal.msg_receive(2).unwrap();
        assert_eq!(osal.pending_events(2) & SYS_EVENT_MSG, 0);
    }

    #[test]
    fn test_invalid_destination_frees_message() {
        let osal = osal();
        let before = osal.msg_available();
        let m = tagged(&osal, 1);

        assert_eq!(osal.msg_send(3, m), Err(OsalError::InvalidTask));
        assert_eq!(osal.msg_available(), before);
    }

    #[test]
    fn test_send_of_queued_message_is_rejected() {
        let osal = osal();
        let m = tagged(&osal, 1);
        osal.msg_send(0, m).unwrap();

        assert_eq!(osal.msg_send(1, m), Err(OsalError::InvalidMsgPointer));
        // Still queued for its first destination
        assert_eq!(osal.msg_count(0, 1), 1);
        assert_eq!(osal.msg_count(1, MSG_EVENT_ANY), 0);
    }

    #[test]
    fn test_find_and_count_by_event() {
        let osal = osal();
        osal.msg_send(1, tagged(&osal, 7)).unwrap();
        let m = tagged(&osal, 8);
        osal.msg_send(1, m).unwrap();
        osal.msg_send(1, tagged(&osal, 7)).unwrap();

        assert_eq!(osal.msg_find(1, 8), Some(m));
        assert_eq!(osal.msg_find(1, 9), None);
        assert_eq!(osal.msg_count(1, 7), 2);
        assert_eq!(osal.msg_count(1, MSG_EVENT_ANY), 3);
    }

    #[test]
    fn test_pool_exhaustion_returns_none() {
        let osal = osal();
        let held: Vec<_> = (0..CFG_MSG_POOL_SIZE).map(|_| osal.msg_allocate(1).unwrap()).collect();
        assert_eq!(osal.msg_available(), 0);
        assert!(osal.msg_allocate(1).is_none());

        osal.msg_deallocate(held[0]).unwrap();
        assert!(osal.msg_allocate(1).is_some());
    }

    #[test]
    fn test_user_queue_operations() {
        let osal = osal();
        let mut q = MsgQueue::new();
        let a = tagged(&osal, 1);
        let b = tagged(&osal, 2);
        let c = tagged(&osal, 3);

        osal.msg_enqueue(&mut q, a).unwrap();
        osal.msg_enqueue(&mut q, b).unwrap();
        osal.msg_push(&mut q, c).unwrap();
        assert_eq!(osal.msg_queue_len(&q), 3);

        // Linked messages cannot be freed or sent
        assert_eq!(osal.msg_deallocate(a), Err(OsalError::MsgBufferNotAvail));

        osal.msg_extract(&mut q, a, None).unwrap();
        assert_eq!(osal.msg_dequeue(&mut q), Some(c));
        assert_eq!(osal.msg_dequeue(&mut q), Some(b));
        assert_eq!(osal.msg_dequeue(&mut q), None);
        assert!(q.is_empty());

        osal.msg_deallocate(a).unwrap();
    }

    #[test]
    fn test_enqueue_max_refuses_when_full() {
        let osal = osal();
        let mut q = MsgQueue::new();
        assert_eq!(osal.msg_enqueue_max(&mut q, tagged(&osal, 1), 1), Ok(true));

        let spare = tagged(&osal, 2);
        assert_eq!(osal.msg_enqueue_max(&mut q, spare, 1), Ok(false));
        assert_eq!(osal.msg_deallocate(spare), Ok(()));
    }

    #[test]
    fn test_payload_bounds() {
        let osal = osal();
        let m = osal.msg_allocate(2).unwrap();
        assert_eq!(osal.msg_len(m), Ok(2));
        assert_eq!(osal.msg_write(m, &[1, 2, 3]), Err(OsalError::InvalidParameter));

        let mut out = [0u8; 8];
        osal.msg_write(m, &[5, 6]).unwrap();
        assert_eq!(osal.msg_read(m, &mut out), Ok(2));
        assert_eq!(&out[..2], &[5, 6]);
    }
}

#[cfg(test)]
mod timer_tests {
    use super::common::*;
    use osal::port::ManualClock;
    use osal::{BusyPoll, Domain, Osal, OsalError, CFG_TIMER_POOL_SIZE};

    fn osal() -> Osal<'static> {
        let osal = Osal::new(&TASKS, &CLOCK, Domain::Standalone(&BusyPoll));
        osal.init_system().unwrap();
        osal
    }

    #[test]
    fn test_fires_once_not_early() {
        let osal = osal();
        osal.start_timer(1, 0x0004, 100).unwrap();

        osal.timer_update(40);
        osal.timer_update(40);
        assert_eq!(osal.pending_events(1), 0);

        osal.timer_update(40);
        assert_eq!(osal.pending_events(1), 0x0004);
        assert_eq!(osal.timer_num_active(), 0);

        osal.clear_event(1, 0x0004).unwrap();
        osal.timer_update(200);
        assert_eq!(osal.pending_events(1), 0);
    }

    #[test]
    fn test_rearm_collapses_to_one_entry() {
        let osal = osal();
        osal.start_timer(0, 0x0001, 500).unwrap();
        osal.start_timer(0, 0x0001, 50).unwrap();

        assert_eq!(osal.timer_num_active(), 1);
        assert_eq!(osal.get_timeout(0, 0x0001), 50);
    }

    #[test]
    fn test_reload_timer_keeps_firing() {
        let osal = osal();
        osal.start_reload_timer(2, 0x0010, 30).unwrap();

        for _ in 0..3 {
            osal.timer_update(30);
            assert_eq!(osal.pending_events(2), 0x0010);
            osal.clear_event(2, 0x0010).unwrap();
        }
        assert_eq!(osal.get_timeout(2, 0x0010), 30);
    }

    #[test]
    fn test_stop_is_reaped_on_next_update() {
        let osal = osal();
        osal.start_timer(0, 0x0001, 10).unwrap();
        osal.start_timer(0, 0x0002, 80).unwrap();

        osal.stop_timer(0, 0x0001).unwrap();
        assert_eq!(osal.stop_timer(0, 0x0001), Err(OsalError::InvalidEventId));
        assert_eq!(osal.timer_num_active(), 2);
        assert_eq!(osal.next_timeout(), 80);

        osal.timer_update(0);
        assert_eq!(osal.timer_num_active(), 1);
        osal.timer_update(20);
        assert_eq!(osal.pending_events(0), 0);
    }

    #[test]
    fn test_eventless_timer_is_reaped() {
        let osal = osal();
        osal.start_timer(0, 0, 100).unwrap();
        assert_eq!(osal.timer_num_active(), 1);

        osal.timer_update(0);
        assert_eq!(osal.timer_num_active(), 0);
        assert_eq!(osal.pending_events(0), 0);
    }

    #[test]
    fn test_start_validates_task_and_pool() {
        let osal = osal();
        assert_eq!(osal.start_timer(3, 0x0001, 10), Err(OsalError::InvalidTask));

        for bit in 0..CFG_TIMER_POOL_SIZE {
            osal.start_timer(0, 1 << bit, 10).unwrap();
        }
        assert_eq!(osal.start_timer(1, 0x0001, 10), Err(OsalError::NoTimerAvail));
    }

    #[test]
    fn test_ticks_convert_with_remainder() {
        static CLK: ManualClock = ManualClock::new(300);
        let osal = Osal::new(&TASKS, &CLK, Domain::Standalone(&BusyPoll));
        osal.init_system().unwrap();
        osal.start_timer(0, 0x0001, 2).unwrap();

        // 900us: not yet a millisecond
        CLK.advance(3);
        osal.run_system().unwrap();
        assert_eq!(osal.system_clock(), 0);

        // 1200us total
        CLK.advance(1);
        osal.run_system().unwrap();
        assert_eq!(osal.system_clock(), 1);
        assert_eq!(osal.get_timeout(0, 0x0001), 1);

        // 2100us total; the 200us carried over counts
        CLK.advance(3);
        assert_eq!(osal.run_system(), Ok(Some(0)));
        assert_eq!(osal.system_clock(), 2);
    }

    #[test]
    fn test_tick_counter_wraps() {
        static CLK: ManualClock = ManualClock::new(1000);
        CLK.set(u32::MAX - 1);
        let osal = Osal::new(&TASKS, &CLK, Domain::Standalone(&BusyPoll));
        osal.init_system().unwrap();

        CLK.advance(5);
        osal.run_system().unwrap();
        assert_eq!(osal.system_clock(), 5);
    }
}

#[cfg(test)]
mod sched_tests {
    use super::common::*;
    use osal::event::SYS_EVENT_MSG;
    use osal::id::TASK_NO_TASK;
    use osal::{BusyPoll, Domain, EventMask, IdleHook, Osal, OsalError, TaskDef, TaskId};
    use portable_atomic::{AtomicU32, AtomicU8, Ordering};

    #[test]
    fn test_lower_index_dispatched_first() {
        let osal = Osal::new(&TASKS, &CLOCK, Domain::Standalone(&BusyPoll));
        osal.init_system().unwrap();

        osal.set_event(1, 0x0001).unwrap();
        osal.set_event(0, 0x0001).unwrap();

        assert_eq!(osal.run_system(), Ok(Some(0)));
        assert_eq!(osal.pending_events(1), 0x0001);
        assert_eq!(osal.run_system(), Ok(Some(1)));
        assert_eq!(osal.run_system(), Ok(None));
    }

    static SEEN_ID: AtomicU8 = AtomicU8::new(0);

    fn record_init(osal: &Osal<'_>, id: TaskId) {
        assert_eq!(osal.self_id(), id);
        SEEN_ID.store(id, Ordering::SeqCst);
        osal.start_timer(id, 0x0001, 0).unwrap();
    }

    fn record_self(osal: &Osal<'_>, id: TaskId, events: EventMask) -> EventMask {
        assert_eq!(osal.self_id(), id);
        SEEN_ID.store(id | 0x40, Ordering::SeqCst);
        events & !0x0001
    }

    static INIT_TASKS: [TaskDef; 2] = [
        TaskDef::new("plain", idle),
        TaskDef::new("hooked", record_self).with_init(record_init),
    ];

    #[test]
    fn test_init_hook_and_self_id() {
        let osal = Osal::new(&INIT_TASKS, &CLOCK, Domain::Standalone(&BusyPoll));
        assert_eq!(osal.set_event(0, 1).map(|_| osal.run_system()), Ok(Err(OsalError::NotInitialized)));

        osal.init_system().unwrap();
        assert_eq!(SEEN_ID.load(Ordering::SeqCst), 1);
        assert_eq!(osal.self_id(), TASK_NO_TASK);
        assert_eq!(osal.init_system(), Err(OsalError::AlreadyInitialized));

        // The zero-length timer armed in init fires on the first pass
        assert_eq!(osal.run_system(), Ok(Some(1)));
        assert_eq!(SEEN_ID.load(Ordering::SeqCst), 0x41);
        assert_eq!(osal.self_id(), TASK_NO_TASK);
    }

    struct CountingIdle(AtomicU32);

    impl IdleHook for CountingIdle {
        fn idle(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_idle_hook_runs_only_when_nothing_ready() {
        static IDLE: CountingIdle = CountingIdle(AtomicU32::new(0));
        let osal = Osal::new(&TASKS, &CLOCK, Domain::Standalone(&IDLE));
        osal.init_system().unwrap();

        osal.run_system().unwrap();
        assert_eq!(IDLE.0.load(Ordering::SeqCst), 1);

        osal.msg_send(2, tagged(&osal, 1)).unwrap();
        assert_eq!(osal.run_system(), Ok(Some(2)));
        assert_eq!(IDLE.0.load(Ordering::SeqCst), 1);
        // The idle handler ignored its message; the bit is not folded back
        assert_eq!(osal.pending_events(2) & SYS_EVENT_MSG, 0);
    }

    #[test]
    fn test_oversized_task_table_rejected() {
        static MANY: [TaskDef; osal::CFG_TASKS_MAX + 1] = [TaskDef::new("t", idle); osal::CFG_TASKS_MAX + 1];
        let osal = Osal::new(&MANY, &CLOCK, Domain::Standalone(&BusyPoll));
        assert_eq!(osal.init_system(), Err(OsalError::InvalidTask));
        assert!(!osal.is_initialized());

        // IDs past the event table are rejected, not indexed
        let last = osal::CFG_TASKS_MAX as TaskId;
        assert_eq!(osal.set_event(last, 0x0001), Err(OsalError::InvalidTask));
        assert_eq!(osal.clear_event(last, 0x0001), Err(OsalError::InvalidTask));
        assert_eq!(osal.pending_events(last), 0);
        assert_eq!(osal.start_timer(last, 0x0001, 10), Err(OsalError::InvalidTask));
    }
}

#[cfg(test)]
mod proxy_tests {
    use super::common::*;
    use osal::event::MSG_EVENT_ANY;
    use osal::id::PROXY_ID_FLAG;
    use osal::{
        Bridge, BridgeError, Domain, EntityId, Enrollment, Inbound, Millis, MsgFormat, Osal, OsalError,
        CFG_MSG_POOL_SIZE, CFG_PROXY_MAX,
    };
    use portable_atomic::{AtomicU32, Ordering};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockBridge {
        inbound: Mutex<VecDeque<(Inbound, Vec<u8>)>>,
        sent: Mutex<Vec<(EntityId, EntityId, Vec<u8>)>>,
        signals: AtomicU32,
        refuse: bool,
    }

    impl MockBridge {
        fn push(&self, src: EntityId, dst: EntityId, format: MsgFormat, data: &[u8]) {
            let inb = Inbound { src, dst, format, len: data.len() };
            self.inbound.lock().unwrap().push_back((inb, data.to_vec()));
        }
    }

    impl Bridge for MockBridge {
        fn fetch(&self, buf: &mut [u8]) -> Option<Inbound> {
            let (inb, data) = self.inbound.lock().unwrap().pop_front()?;
            buf[..data.len()].copy_from_slice(&data);
            Some(inb)
        }

        fn send(&self, src: EntityId, dst: EntityId, _: MsgFormat, payload: &[u8]) -> Result<(), BridgeError> {
            if self.refuse {
                return Err(BridgeError::NoResource);
            }
            self.sent.lock().unwrap().push((src, dst, payload.to_vec()));
            Ok(())
        }

        fn set_alarm(&self, _: Millis) {}

        fn wait(&self) {}

        fn signal(&self) {
            self.signals.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn bridged(bridge: &MockBridge) -> Osal<'_> {
        let osal = Osal::new(&TASKS, &CLOCK, Domain::Bridged(bridge));
        osal.init_system().unwrap();
        osal
    }

    #[test]
    fn test_proxy_table_exhaustion_is_fatal() {
        let bridge = MockBridge::default();
        let osal = bridged(&bridge);
        for alien in 0..CFG_PROXY_MAX as EntityId {
            assert_eq!(osal.alien_to_proxy(alien + 10), alien | PROXY_ID_FLAG);
        }
        // Known entities keep their slot
        assert_eq!(osal.alien_to_proxy(10), PROXY_ID_FLAG);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| osal.alien_to_proxy(99)));
        assert!(result.is_err());
        assert_eq!(osal.proxy_to_alien(PROXY_ID_FLAG), 10);
    }

    #[test]
    fn test_inbound_then_reply_through_proxy() {
        let bridge = MockBridge::default();
        let osal = bridged(&bridge);
        osal.enroll_dispatch_id(1, 0x21).unwrap();
        bridge.push(0x33, 0x21, MsgFormat::FirstByteTaskId, &[0xAA, 5, 6]);

        assert_eq!(osal.run_system(), Ok(Some(1)));
        // The handler leaves the message queued
        let m = osal.msg_receive(1).unwrap();

        let mut out = [0u8; 3];
        osal.msg_read(m, &mut out).unwrap();
        let proxy = out[0];
        assert_eq!(proxy, PROXY_ID_FLAG);
        assert_eq!(&out[1..], &[5, 6]);
        osal.msg_deallocate(m).unwrap();

        // Sending to the proxy ID goes back out under the no-task identity
        osal.enroll_notask_sender(0x01);
        let reply = osal.msg_allocate(2).unwrap();
        osal.msg_write(reply, &[7, 8]).unwrap();
        let free_before = osal.msg_available();
        osal.msg_send(proxy, reply).unwrap();

        assert_eq!(osal.msg_available(), free_before + 1);
        assert_eq!(bridge.sent.lock().unwrap().as_slice(), &[(0x01, 0x33, vec![7, 8])]);
    }

    #[test]
    fn test_task_sends_under_its_enrollment() {
        let bridge = MockBridge::default();
        let osal = bridged(&bridge);
        osal.enroll_sender_id(2, 0x50).unwrap();
        assert_eq!(osal.enrollment(2), Enrollment::SenderOnly(0x50));
        assert_eq!(osal.dispatch_to_task(0x50), None);

        let proxy = osal.alien_to_proxy(0x60);
        let m = osal.msg_allocate(1).unwrap();
        osal.send_across_domain(2, 0x60, m).unwrap();
        assert_eq!(bridge.sent.lock().unwrap()[0].0, 0x50);
        assert_eq!(osal.proxy_to_alien(proxy), 0x60);

        assert_eq!(osal.enroll_dispatch_id(3, 0x51), Err(OsalError::InvalidTask));
    }

    #[test]
    fn test_refused_send_frees_message() {
        let bridge = MockBridge { refuse: true, ..Default::default() };
        let osal = bridged(&bridge);
        osal.enroll_notask_sender(0x01);
        let proxy = osal.alien_to_proxy(0x70);

        let before = osal.msg_available();
        let m = osal.msg_allocate(1).unwrap();
        assert_eq!(osal.msg_send(proxy, m), Err(OsalError::Failure));
        assert_eq!(osal.msg_available(), before);
    }

    #[test]
    #[should_panic]
    fn test_inbound_for_unknown_entity_is_fatal() {
        let bridge = MockBridge::default();
        let osal = bridged(&bridge);
        bridge.push(0x33, 0x7F, MsgFormat::Keep, &[1]);
        let _ = osal.run_system();
    }

    #[test]
    #[should_panic]
    fn test_send_to_unmapped_proxy_is_fatal() {
        let bridge = MockBridge::default();
        let osal = bridged(&bridge);
        osal.proxy_to_alien(PROXY_ID_FLAG | 2);
    }

    #[test]
    fn test_inbound_dropped_when_pool_full() {
        let bridge = MockBridge::default();
        let osal = bridged(&bridge);
        osal.enroll_dispatch_id(0, 0x21).unwrap();

        let held: Vec<_> = (0..CFG_MSG_POOL_SIZE).map(|_| osal.msg_allocate(1).unwrap()).collect();
        bridge.push(0x33, 0x21, MsgFormat::Keep, &[1, 2]);

        assert_eq!(osal.run_system(), Ok(None));
        assert_eq!(osal.msg_count(0, MSG_EVENT_ANY), 0);
        assert!(bridge.inbound.lock().unwrap().is_empty());

        // The sender still got its proxy slot
        assert_eq!(osal.proxy_to_alien(PROXY_ID_FLAG), 0x33);
        for m in held {
            osal.msg_deallocate(m).unwrap();
        }
    }

    #[test]
    fn test_set_event_outside_tasks_signals_bridge() {
        let bridge = MockBridge::default();
        let osal = bridged(&bridge);

        osal.set_event(0, 0x0001).unwrap();
        assert_eq!(bridge.signals.load(Ordering::SeqCst), 1);
        assert_eq!(osal.run_system(), Ok(Some(0)));
    }
}

#[cfg(test)]
mod error_tests {
    use osal::OsalError;

    #[test]
    fn test_status_codes() {
        assert_eq!(OsalError::Success.status(), 0x00);
        assert_eq!(OsalError::InvalidTask.status(), 0x03);
        assert_eq!(OsalError::MsgBufferNotAvail.status(), 0x04);
        assert_eq!(OsalError::InvalidMsgPointer.status(), 0x05);
        assert_eq!(OsalError::InvalidEventId.status(), 0x06);
        assert_eq!(OsalError::NoTimerAvail.status(), 0x08);
        assert_eq!(u8::from(OsalError::Failure), 0x01);
    }

    #[test]
    fn test_from_result() {
        assert_eq!(OsalError::from_result(Ok(())), 0x00);
        assert_eq!(OsalError::from_result::<()>(Err(OsalError::InvalidTask)), 0x03);
        assert!(OsalError::Success.is_ok());
        assert!(OsalError::NoTimerAvail.is_err());
    }
}

#[cfg(test)]
mod config_tests {
    use osal::config::*;
    use osal::id::PROXY_ID_FLAG;

    #[test]
    fn test_config_values() {
        assert!(CFG_TASKS_MAX <= PROXY_ID_FLAG as usize);
        assert!(CFG_PROXY_MAX <= PROXY_ID_FLAG as usize);
        assert!(CFG_MSG_PAYLOAD_MAX >= 3);
        assert!(CFG_TIMER_POOL_SIZE <= u8::MAX as usize);
        assert!(CFG_TICK_RATE_HZ > 0 && 1_000_000 % CFG_TICK_RATE_HZ == 0);
    }
}
