//! # Lifecycle Tests
//!
//! Initialization, draining shutdown, racing emitters, and registry growth
//! observed through the public bus API.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use std::sync::Arc;
    use std::thread;
    use topic_bus::{Bus, BusState, TopicId};

    #[test]
    fn test_concurrent_shutdown_does_not_hang() {
        init_tracing();
        let bus = Arc::new(test_bus(4));
        let counter = Arc::new(CountingHandler::default());
        bus.initialize(vec![counter.clone()]).unwrap();
        for _ in 0..100 {
            bus.emit(TestEvent::Ping);
        }

        let callers: Vec<_> = (0..2)
            .map(|_| {
                let bus = bus.clone();
                thread::spawn(move || bus.shutdown())
            })
            .collect();
        for caller in callers {
            caller.join().unwrap();
        }

        assert_eq!(bus.live_workers(), 0);
        assert_eq!(bus.state(), BusState::Terminated);
        assert_eq!(counter.count(), 100);
    }

    #[test]
    fn test_shutdown_waits_for_queued_events() {
        init_tracing();
        let bus = test_bus(1);
        let wg = WaitGroup::new();
        let recorder = Arc::new(OrderRecorder::new(wg.clone()));
        bus.initialize(vec![recorder.clone()]).unwrap();

        wg.add(400);
        for position in 0..200 {
            bus.emit(TestEvent::Concurrent { position });
            bus.emit(TestEvent::ordered(position));
        }
        bus.shutdown();

        // Nothing left to wait for once shutdown returns.
        assert!(wg.wait_timeout(std::time::Duration::ZERO));
        assert_eq!(recorder.positions(None).len(), 400);
        assert_eq!(
            recorder.positions(Some(&ORDER_TOPIC)),
            (0..200).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_emit_after_shutdown_is_rejected() {
        init_tracing();
        let bus = test_bus(2);
        let errors = Arc::new(StoreErrorsHandler::default());
        bus.add_error_handler(errors.clone());
        let counter = Arc::new(CountingHandler::default());
        bus.initialize(vec![counter.clone()]).unwrap();
        bus.shutdown();

        bus.emit(TestEvent::Ping);
        bus.emit(TestEvent::ordered(0));

        assert_eq!(counter.count(), 0);
        assert_eq!(
            errors.errors_for(TEST_PING),
            vec![ErrorKind::ShuttingDown]
        );
        assert_eq!(
            errors.errors_for(TEST_ORDER_EVENT),
            vec![ErrorKind::ShuttingDown]
        );
        assert!(errors.all().iter().all(|e| e.had_event));
    }

    #[test]
    fn test_emit_racing_shutdown_loses_nothing() {
        init_tracing();
        let bus = Arc::new(test_bus(4));
        let errors = Arc::new(StoreErrorsHandler::default());
        bus.add_error_handler(errors.clone());
        let counter = Arc::new(CountingHandler::default());
        bus.initialize(vec![counter.clone()]).unwrap();

        let emitters: Vec<_> = (0..4)
            .map(|n| {
                let bus = bus.clone();
                thread::spawn(move || {
                    for position in 0..500 {
                        if n % 2 == 0 {
                            bus.emit(TestEvent::Ping);
                        } else {
                            bus.emit(TestEvent::ordered(position));
                        }
                    }
                })
            })
            .collect();

        thread::sleep(std::time::Duration::from_millis(1));
        bus.shutdown();
        for emitter in emitters {
            emitter.join().unwrap();
        }

        let rejected = errors.count(&ErrorKind::ShuttingDown);
        assert_eq!(counter.count() + rejected, 2000);
        assert_eq!(errors.all().len(), rejected);
    }

    #[test]
    fn test_registry_grows_past_initial_capacity() {
        init_tracing();
        let capacity = 3;
        let bus = test_bus(2);
        bus.set_registry_capacity(capacity);
        let wg = WaitGroup::new();
        let counter = Arc::new(CountingHandler::with_wait_group(wg.clone()));
        bus.initialize(vec![counter.clone()]).unwrap();
        assert_eq!(bus.topic_capacity(), capacity);

        let topics: Vec<TopicId> = (0..=capacity)
            .map(|n| TopicId::from(format!("grow-{n}")))
            .collect();
        wg.add(topics.len() * 2);
        for topic in topics.iter().chain(topics.iter()) {
            bus.emit(TestEvent::Topic(topic.clone()));
        }
        assert!(wg.wait_timeout(WAIT));

        assert_eq!(bus.topic_count(), capacity + 1);
        assert!(bus.topic_capacity() >= capacity * 2);
        assert!(topics.iter().all(|topic| bus.has_topic(topic)));
        assert_eq!(counter.count(), topics.len() * 2);
        bus.shutdown();
    }

    #[test]
    fn test_drop_drains_the_bus() {
        init_tracing();
        let counter = Arc::new(CountingHandler::default());
        {
            let bus = test_bus(2);
            bus.initialize(vec![counter.clone()]).unwrap();
            for position in 0..100 {
                bus.emit(TestEvent::ordered(position));
                bus.emit(TestEvent::Ping);
            }
        }
        assert_eq!(counter.count(), 200);
    }

    #[test]
    fn test_initialize_after_shutdown_is_a_no_op() {
        init_tracing();
        let bus: Bus<TestEvent> = test_bus(2);
        bus.initialize(Vec::new()).unwrap();
        bus.shutdown();

        let counter = Arc::new(CountingHandler::default());
        bus.initialize(vec![counter.clone()]).unwrap();
        bus.emit(TestEvent::Ping);

        assert_eq!(bus.state(), BusState::Terminated);
        assert_eq!(bus.live_workers(), 0);
        assert_eq!(bus.handler_count(), 0);
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_zero_sized_pool_still_serves_topics() {
        init_tracing();
        let bus = test_bus(0);
        let wg = WaitGroup::new();
        let counter = Arc::new(CountingHandler::with_wait_group(wg.clone()));
        bus.initialize(vec![counter.clone()]).unwrap();
        assert_eq!(bus.live_workers(), 0);

        wg.add(10);
        for position in 0..10 {
            bus.emit(TestEvent::ordered(position));
        }
        assert!(wg.wait_timeout(WAIT));
        bus.shutdown();
        assert_eq!(counter.count(), 10);
    }
}
