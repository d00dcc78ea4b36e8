use async_trait::async_trait;
use gatt_peripheral::{
    error::{Error, ErrorType},
    gatt::{
        access::{NetworkScan, RandomSample, ReadOptions, StoredValue},
        application::Application,
        export::{Interface, ManagedObjects, PropertyMap, PropertyValue},
        notify::{NotifyState, Scheduler},
        path::AttributePath,
        properties::AttributeFlag,
        request::AccessRequest,
    },
    uuid::ShortUuid,
    FixedNetworks, ManagerBridge, Peripheral, RegisterOptions,
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};
use uuid::Uuid;

const INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq)]
struct Changed {
    path: AttributePath,
    interface: Interface,
    value: Vec<u8>,
}

#[derive(Clone, Default)]
struct RecordingBridge {
    events: Arc<Mutex<Vec<Changed>>>,
    registered: Arc<Mutex<Option<ManagedObjects>>>,
    refuse: bool,
}

impl RecordingBridge {
    fn events(&self) -> Vec<Changed> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManagerBridge for RecordingBridge {
    async fn register(
        &mut self,
        _root: &AttributePath,
        _options: &RegisterOptions,
        objects: ManagedObjects,
    ) -> Result<(), Error> {
        if self.refuse {
            return Err(Error::from_type(ErrorType::Registration));
        }
        *self.registered.lock().unwrap() = Some(objects);
        Ok(())
    }

    fn properties_changed(
        &mut self,
        path: &AttributePath,
        interface: Interface,
        changed: PropertyMap,
        invalidated: Vec<String>,
    ) {
        assert!(invalidated.is_empty());
        let value = match changed.get("Value") {
            Some(PropertyValue::Bytes(value)) => value.clone(),
            other => panic!("unexpected change {:?}", other),
        };
        self.events.lock().unwrap().push(Changed {
            path: path.clone(),
            interface,
            value,
        });
    }
}

fn notify_tree() -> (Application, AttributePath) {
    let mut app = Application::default();
    app.add_service(Uuid::from_short(0x180d), true)
        .add_characteristic(
            Uuid::from_short(0x2a37),
            [AttributeFlag::Read, AttributeFlag::Notify],
            RandomSample::with_seed(INTERVAL, 60, 90, 1),
        );
    (app, AttributePath::new("/service0/char0"))
}

#[tokio::test(start_paused = true)]
async fn one_event_per_interval_then_none_after_stop() {
    let (mut app, path) = notify_tree();
    let mut scheduler = Scheduler::new();
    let mut bridge = RecordingBridge::default();

    app.start_notify(&path, &mut scheduler).unwrap();
    assert_eq!(app.fire_due(Instant::now(), &mut scheduler, &mut bridge), 0);

    tokio::time::advance(INTERVAL).await;
    app.fire_due(Instant::now(), &mut scheduler, &mut bridge);
    let events = bridge.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path, path);
    assert_eq!(events[0].interface, Interface::Characteristic);
    assert_eq!(
        app.read_value(&path, &ReadOptions::default()).unwrap(),
        events[0].value
    );

    app.stop_notify(&path).unwrap();
    for _ in 0..5 {
        tokio::time::advance(INTERVAL).await;
        app.fire_due(Instant::now(), &mut scheduler, &mut bridge);
    }
    assert_eq!(bridge.events().len(), 1);
    assert!(scheduler.is_empty());
    assert_eq!(
        app.characteristic(&path).unwrap().notify_state(),
        NotifyState::Idle
    );
}

#[tokio::test(start_paused = true)]
async fn start_notify_twice_schedules_once() {
    let (mut app, path) = notify_tree();
    let mut scheduler = Scheduler::new();
    let mut bridge = RecordingBridge::default();

    app.start_notify(&path, &mut scheduler).unwrap();
    app.start_notify(&path, &mut scheduler).unwrap();
    assert_eq!(scheduler.len(), 1);

    for _ in 0..3 {
        tokio::time::advance(INTERVAL).await;
        app.fire_due(Instant::now(), &mut scheduler, &mut bridge);
    }
    assert_eq!(bridge.events().len(), 3);
    assert_eq!(scheduler.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_notify_while_idle_is_a_no_op() {
    let (mut app, path) = notify_tree();
    app.stop_notify(&path).unwrap();
    app.stop_notify(&path).unwrap();
    assert_eq!(
        app.characteristic(&path).unwrap().notify_state(),
        NotifyState::Idle
    );
}

#[tokio::test(start_paused = true)]
async fn network_scan_pushes_first_identifier() {
    let networks = Arc::new(FixedNetworks::new(vec!["cafe".into(), "lab".into()]));
    let mut app = Application::default();
    app.add_service(Uuid::from_short(0x181c), true)
        .add_characteristic(
            Uuid::from_short(0x2a00),
            [AttributeFlag::Read, AttributeFlag::Notify],
            NetworkScan::new(Duration::from_secs(5), networks.clone()),
        );
    let path = AttributePath::new("/service0/char0");
    let mut scheduler = Scheduler::new();
    let mut bridge = RecordingBridge::default();

    app.start_notify(&path, &mut scheduler).unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;
    app.fire_due(Instant::now(), &mut scheduler, &mut bridge);

    networks.set(vec!["lab".into()]);
    tokio::time::advance(Duration::from_secs(5)).await;
    app.fire_due(Instant::now(), &mut scheduler, &mut bridge);

    let values: Vec<_> = bridge.events().into_iter().map(|e| e.value).collect();
    assert_eq!(values, vec![b"cafe".to_vec(), b"lab".to_vec()]);
}

#[tokio::test(start_paused = true)]
async fn fire_due_runs_each_due_tick_once_per_call() {
    let mut app = Application::default();
    app.add_service(Uuid::from_short(0x180d), true)
        .add_characteristic(
            Uuid::from_short(0x2a37),
            [AttributeFlag::Read, AttributeFlag::Notify],
            RandomSample::with_seed(Duration::ZERO, 0, 10, 3),
        );
    let path = AttributePath::new("/service0/char0");
    let mut scheduler = Scheduler::new();
    let mut bridge = RecordingBridge::default();

    app.start_notify(&path, &mut scheduler).unwrap();
    assert_eq!(app.fire_due(Instant::now(), &mut scheduler, &mut bridge), 1);
    assert_eq!(bridge.events().len(), 1);
    assert_eq!(scheduler.len(), 1);

    assert_eq!(app.fire_due(Instant::now(), &mut scheduler, &mut bridge), 1);
    assert_eq!(bridge.events().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn restart_waits_a_full_interval_for_the_first_event() {
    let (mut app, path) = notify_tree();
    let mut scheduler = Scheduler::new();
    let mut bridge = RecordingBridge::default();

    app.start_notify(&path, &mut scheduler).unwrap();
    tokio::time::advance(Duration::from_millis(100)).await;
    app.stop_notify(&path).unwrap();
    tokio::time::advance(Duration::from_millis(800)).await;
    app.start_notify(&path, &mut scheduler).unwrap();

    tokio::time::advance(Duration::from_millis(100)).await;
    app.fire_due(Instant::now(), &mut scheduler, &mut bridge);
    assert!(bridge.events().is_empty());

    tokio::time::advance(Duration::from_millis(900)).await;
    app.fire_due(Instant::now(), &mut scheduler, &mut bridge);
    assert_eq!(bridge.events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn notify_requires_the_notify_flag() {
    let networks = Arc::new(FixedNetworks::new(vec!["cafe".into()]));
    let mut app = Application::default();
    let service = app.add_service(Uuid::from_short(0x181c), true);
    service.add_characteristic(
        Uuid::from_short(0x2a00),
        [AttributeFlag::Read],
        RandomSample::with_seed(INTERVAL, 0, 10, 5),
    );
    service.add_characteristic(
        Uuid::from_short(0x2a01),
        [AttributeFlag::Read],
        NetworkScan::new(INTERVAL, networks),
    );
    let mut scheduler = Scheduler::new();
    let mut bridge = RecordingBridge::default();

    for path in ["/service0/char0", "/service0/char1"] {
        let path = AttributePath::new(path);
        let err = app.start_notify(&path, &mut scheduler).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotSupported);
        let err = app.stop_notify(&path).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotSupported);
    }
    assert!(scheduler.is_empty());

    tokio::time::advance(INTERVAL * 3).await;
    assert_eq!(app.fire_due(Instant::now(), &mut scheduler, &mut bridge), 0);
    assert!(bridge.events().is_empty());
}

async fn request<T>(
    sender_tx: &mpsc::Sender<AccessRequest>,
    make: impl FnOnce(oneshot::Sender<T>) -> AccessRequest,
) -> T {
    let (res_tx, res_rx) = oneshot::channel();
    sender_tx.send(make(res_tx)).await.unwrap();
    res_rx.await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn event_loop_serves_requests_and_ticks() {
    let (mut app, path) = notify_tree();
    app.add_service(Uuid::from_short(0x1800), true)
        .add_characteristic(
            Uuid::from_short(0x2a00),
            [AttributeFlag::Read, AttributeFlag::Write],
            StoredValue,
        );
    let stored = AttributePath::new("/service1/char0");

    let bridge = RecordingBridge::default();
    let (sender_tx, receiver_rx) = mpsc::channel(16);
    let handle = tokio::spawn(Peripheral::new(app, bridge.clone(), receiver_rx).run());

    let objects = request(&sender_tx, |responder| AccessRequest::GetManagedObjects {
        responder,
    })
    .await;
    assert_eq!(objects.len(), 4);
    assert_eq!(bridge.registered.lock().unwrap().as_ref(), Some(&objects));

    let p = stored.clone();
    request(&sender_tx, |responder| AccessRequest::WriteValue {
        path: p,
        value: b"hello".to_vec(),
        options: Default::default(),
        responder,
    })
    .await
    .unwrap();
    let p = stored.clone();
    let value = request(&sender_tx, |responder| AccessRequest::ReadValue {
        path: p,
        options: Default::default(),
        responder,
    })
    .await
    .unwrap();
    assert_eq!(value, b"hello");

    let p = path.clone();
    request(&sender_tx, |responder| AccessRequest::StartNotify {
        path: p,
        responder,
    })
    .await
    .unwrap();

    tokio::time::sleep(INTERVAL + Duration::from_millis(500)).await;
    assert_eq!(bridge.events().len(), 1);

    let p = path.clone();
    request(&sender_tx, |responder| AccessRequest::StopNotify {
        path: p,
        responder,
    })
    .await
    .unwrap();

    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(bridge.events().len(), 1);

    let p = path.clone();
    let err = request(&sender_tx, |responder| AccessRequest::GetAll {
        path: p,
        interface: "Descriptor".to_string(),
        responder,
    })
    .await
    .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::InvalidArgs);

    drop(sender_tx);
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn registration_failure_ends_the_loop() {
    let (app, _) = notify_tree();
    let bridge = RecordingBridge {
        refuse: true,
        ..Default::default()
    };
    let (_sender_tx, receiver_rx) = mpsc::channel(16);
    let err = Peripheral::new(app, bridge, receiver_rx)
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Registration);
}
