//! # Integration Tests
//!
//! End-to-end tests across crates.
//!
//! Covers:
//! - Configuration contract (file layout in, effective layout out)
//! - Producer + cache + several distribution loops at independent rates
//! - Real UDP bus and WebSocket round trips, publisher to subscriber

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ChannelKind, ForwardPolicy, Role};

    const FULL_CONFIG: &str = r#"
role = "publisher"

[producer]
rate_hz = 50.0
log_every = 100

[trajectory]
center_lon = 107.02243
center_lat = 20.763
amplitude = 0.05
angular_step = 0.01

[[channels]]
name = "bus"
kind = "bus"
rate_hz = 20.0
[channels.params]
addr = "127.0.0.1:7400"

[[channels]]
name = "websocket"
kind = "websocket"
rate_hz = 10.0
[channels.params]
bind = "0.0.0.0:8081"
"#;

    #[test]
    fn test_documented_layout_matches_defaults() {
        let blueprint = ConfigLoader::load_from_str(FULL_CONFIG, ConfigFormat::Toml).unwrap();
        let defaults = contracts::PipelineBlueprint::default();

        assert_eq!(blueprint.role, Role::Publisher);
        assert_eq!(blueprint.trajectory, defaults.trajectory);

        let configured = blueprint.effective_channels();
        let default_channels = defaults.effective_channels();
        assert_eq!(configured.len(), default_channels.len());
        for (a, b) in configured.iter().zip(&default_channels) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.rate_hz, b.rate_hz);
            assert_eq!(a.effective_policy(), b.effective_policy());
        }
        assert_eq!(configured[1].kind, ChannelKind::Websocket);
        assert_eq!(configured[1].effective_policy(), ForwardPolicy::RequireAudience);
    }

    #[test]
    fn test_serialized_config_loads_back() {
        let blueprint = ConfigLoader::load_from_str(FULL_CONFIG, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();

        assert_eq!(reloaded.channels.len(), 2);
        assert_eq!(reloaded.producer.rate_hz, 50.0);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{
        ChannelConfig, ChannelKind, ContractError, ForwardPolicy, Sample, TransportSink,
        WireFormat,
    };
    use dispatcher::{create_channel, BusListener, DistributionLoop, TickOutcome};
    use futures_util::StreamExt;
    use producer::{ProducerLoop, TrajectoryGenerator};
    use scheduler::{PeriodicScheduler, ScheduleStats, ShutdownSignal};
    use shared_state::LatestValueCache;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    /// Records forwarded sequences; optionally refuses every send
    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<u64>>>,
        broken: bool,
    }

    impl RecordingSink {
        fn sent(&self) -> Vec<u64> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl TransportSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn has_audience(&self) -> bool {
            true
        }

        async fn send(&mut self, sample: &Sample) -> Result<(), ContractError> {
            if self.broken {
                return Err(ContractError::transport_send("recording", "link down"));
            }
            self.sent.lock().unwrap().push(sample.sequence);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn spawn_producer(
        cache: &Arc<LatestValueCache>,
        shutdown: &ShutdownSignal,
        rate_hz: f64,
    ) -> JoinHandle<ScheduleStats> {
        let scheduler = PeriodicScheduler::from_rate_hz("producer", rate_hz).unwrap();
        let mut producer = ProducerLoop::new(TrajectoryGenerator::default(), cache.clone(), 100);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(&mut producer, &shutdown).await })
    }

    fn spawn_loop<S: TransportSink + 'static>(
        mut dl: DistributionLoop<S>,
        rate_hz: f64,
        shutdown: &ShutdownSignal,
    ) -> JoinHandle<(ScheduleStats, dispatcher::DistributionReport)> {
        let scheduler = PeriodicScheduler::from_rate_hz(dl.name(), rate_hz).unwrap();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let stats = scheduler.run(&mut dl, &shutdown).await;
            (stats, dl.finish().await)
        })
    }

    async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
    }

    /// Two loops at 20 Hz and 10 Hz over a 50 Hz producer
    #[tokio::test(start_paused = true)]
    async fn test_independent_rates_over_one_producer() {
        let cache = Arc::new(LatestValueCache::new());
        let shutdown = ShutdownSignal::new();

        let fast_sink = RecordingSink::default();
        let slow_sink = RecordingSink::default();

        let producer = spawn_producer(&cache, &shutdown, 50.0);
        let fast = spawn_loop(
            DistributionLoop::new("fast", cache.clone(), fast_sink.clone(), ForwardPolicy::Always),
            20.0,
            &shutdown,
        );
        let slow = spawn_loop(
            DistributionLoop::new("slow", cache.clone(), slow_sink.clone(), ForwardPolicy::Always),
            10.0,
            &shutdown,
        );

        tokio::time::sleep(Duration::from_millis(2010)).await;
        shutdown.trigger();

        let producer_stats = producer.await.unwrap();
        let (_, fast_report) = fast.await.unwrap();
        let (_, slow_report) = slow.await.unwrap();

        assert_eq!(producer_stats.ticks, 100);
        assert_eq!(cache.latest_sequence(), 100);

        let fast_sent = fast_sink.sent();
        let slow_sent = slow_sink.sent();
        assert_eq!(fast_sent.len(), 40);
        assert_eq!(slow_sent.len(), 20);

        // each loop forwards a strictly increasing subsequence
        assert!(fast_sent.windows(2).all(|w| w[0] < w[1]));
        assert!(slow_sent.windows(2).all(|w| w[0] < w[1]));
        assert!(fast_sent.iter().all(|s| (1..=100).contains(s)));
        assert_ne!(fast_sent, slow_sent);

        assert_eq!(fast_report.counters.forwarded, 40);
        assert_eq!(slow_report.counters.forwarded, 20);
    }

    /// A failing transport never holds back another loop
    #[tokio::test(start_paused = true)]
    async fn test_failing_transport_is_isolated() {
        let cache = Arc::new(LatestValueCache::new());
        let shutdown = ShutdownSignal::new();

        let broken_sink = RecordingSink {
            broken: true,
            ..Default::default()
        };
        let healthy_sink = RecordingSink::default();

        let producer = spawn_producer(&cache, &shutdown, 50.0);
        let broken = spawn_loop(
            DistributionLoop::new("broken", cache.clone(), broken_sink, ForwardPolicy::Always),
            20.0,
            &shutdown,
        );
        let healthy = spawn_loop(
            DistributionLoop::new("healthy", cache.clone(), healthy_sink.clone(), ForwardPolicy::Always),
            20.0,
            &shutdown,
        );

        tokio::time::sleep(Duration::from_millis(1010)).await;
        shutdown.trigger();
        producer.await.unwrap();

        let (broken_stats, broken_report) = broken.await.unwrap();
        let (_, healthy_report) = healthy.await.unwrap();

        assert_eq!(broken_stats.failed_ticks, 20);
        assert_eq!(broken_report.counters.failed, 20);
        assert_eq!(broken_report.counters.last_forwarded, 0);

        assert_eq!(healthy_report.counters.forwarded, 20);
        assert_eq!(healthy_sink.sent().len(), 20);
    }

    /// Publisher bus channel -> subscriber listener -> subscriber WebSocket
    #[tokio::test]
    async fn test_publisher_to_subscriber_round_trip() {
        // Subscriber side
        let sub_cache = Arc::new(LatestValueCache::new());
        let sub_shutdown = ShutdownSignal::new();
        let listener = BusListener::bind(
            "127.0.0.1:0".parse().unwrap(),
            WireFormat::Bincode,
            sub_cache.clone(),
        )
        .await
        .unwrap();
        let bus_addr = listener.local_addr().unwrap();
        let listener_task = {
            let shutdown = sub_shutdown.clone();
            tokio::spawn(async move { listener.run(&shutdown).await })
        };

        let ws_config = ChannelConfig::new("websocket", ChannelKind::Websocket, 10.0)
            .with_param("bind", "127.0.0.1:0");
        let ws_loop = create_channel(&ws_config, sub_cache.clone(), &sub_shutdown)
            .await
            .unwrap();
        let ws_addr = match ws_loop.sink() {
            dispatcher::ChannelSink::WebSocket(sink) => sink.local_addr(),
            _ => unreachable!("websocket channel"),
        };
        let ws_metrics = ws_loop.metrics();
        let ws_task = spawn_loop(ws_loop, 10.0, &sub_shutdown);

        // Publisher side
        let pub_cache = Arc::new(LatestValueCache::new());
        let pub_shutdown = ShutdownSignal::new();
        let bus_config = ChannelConfig::new("bus", ChannelKind::Bus, 20.0)
            .with_param("addr", bus_addr.to_string())
            .with_param("format", "bincode");
        let bus_loop = create_channel(&bus_config, pub_cache.clone(), &pub_shutdown)
            .await
            .unwrap();
        let producer = spawn_producer(&pub_cache, &pub_shutdown, 50.0);
        let bus_task = spawn_loop(bus_loop, 20.0, &pub_shutdown);

        wait_until("bus records", || sub_cache.latest_sequence() >= 3).await;
        wait_until("an unheard websocket tick", || {
            ws_metrics.snapshot().no_audience >= 1
        })
        .await;

        let url = format!("ws://{ws_addr}");
        let (mut client, _) = connect_async(url.as_str()).await.unwrap();

        let mut times = Vec::new();
        while times.len() < 2 {
            let message = tokio::time::timeout(Duration::from_secs(3), client.next())
                .await
                .expect("no push within timeout")
                .unwrap()
                .unwrap();
            let Message::Text(text) = message else {
                continue;
            };
            let payload: serde_json::Value = serde_json::from_str(&text).unwrap();
            let lon = payload["coords"][0].as_f64().unwrap();
            let lat = payload["coords"][1].as_f64().unwrap();
            assert!((lon - 107.02243).abs() <= 0.05 + 1e-9);
            assert!((lat - 20.763).abs() <= 0.05 + 1e-9);
            times.push(payload["time"].as_i64().unwrap());
        }
        assert!(times[0] < times[1], "pushes not newer: {times:?}");

        // Shut both sides down; the client is told the server is going away
        pub_shutdown.trigger();
        sub_shutdown.trigger();

        let close = tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                match client.next().await {
                    Some(Ok(Message::Close(frame))) => return frame,
                    Some(Ok(_)) => continue,
                    other => panic!("expected close frame, got {other:?}"),
                }
            }
        })
        .await
        .expect("no close frame");
        assert!(close.is_some());

        producer.await.unwrap();
        let (_, bus_report) = bus_task.await.unwrap();
        let (_, ws_report) = ws_task.await.unwrap();
        let listener_stats = listener_task.await.unwrap();

        assert!(bus_report.counters.forwarded >= 3);
        assert_eq!(bus_report.counters.failed, 0);
        assert!(ws_report.counters.forwarded >= 2);
        assert!(ws_report.counters.no_audience >= 1);
        assert_eq!(listener_stats.rejected, 0);
        assert!(listener_stats.accepted >= 3);
    }

    /// WebSocket loop waits for an audience without moving its cursor
    #[tokio::test]
    async fn test_websocket_waits_for_audience() {
        let cache = Arc::new(LatestValueCache::new());
        let shutdown = ShutdownSignal::new();
        let config = ChannelConfig::new("websocket", ChannelKind::Websocket, 10.0)
            .with_param("bind", "127.0.0.1:0");
        let mut dl = create_channel(&config, cache.clone(), &shutdown).await.unwrap();

        cache.update(TrajectoryGenerator::default().next());
        assert_eq!(dl.tick_once().await.unwrap(), TickOutcome::NoAudience);
        assert_eq!(dl.cursor(), 0);

        let addr = match dl.sink() {
            dispatcher::ChannelSink::WebSocket(sink) => sink.local_addr(),
            _ => unreachable!("websocket channel"),
        };
        let (mut client, _) = connect_async(format!("ws://{addr}").as_str()).await.unwrap();
        wait_until("client registration", || dl.sink().has_audience()).await;

        assert_eq!(dl.tick_once().await.unwrap(), TickOutcome::Forwarded(1));
        let frame = client.next().await.unwrap().unwrap();
        assert!(matches!(frame, Message::Text(_)));

        shutdown.trigger();
        dl.finish().await;
    }
}
