/// Unit tests for SyncPair

use super::*;
use crate::config::Config;
use crate::graphics_device::{DeviceEvent, HeadlessGraphicsDevice};

fn device_with_pair() -> (HeadlessGraphicsDevice, SyncPair) {
    let mut device = HeadlessGraphicsDevice::new(&Config::default()).unwrap();
    let fence = device.create_fence(true).unwrap();
    let semaphore = device.create_semaphore().unwrap();
    (device, SyncPair::new(fence, semaphore))
}

#[test]
fn test_release_twice() {
    let (mut device, pair) = device_with_pair();
    assert_eq!(device.live_resource_count(), 2);

    assert_eq!(pair.release(&mut device), 2);
    assert_eq!(pair.release(&mut device), 0);
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn test_release_destroys_fence_first() {
    let (mut device, pair) = device_with_pair();
    let journal = device.journal();
    pair.release(&mut device);

    let destroyed: Vec<DeviceResource> = journal
        .events()
        .into_iter()
        .filter_map(|event| match event {
            DeviceEvent::Destroyed(resource) => Some(resource),
            _ => None,
        })
        .collect();
    assert_eq!(
        destroyed,
        vec![DeviceResource::Fence(pair.fence), DeviceResource::Semaphore(pair.semaphore)]
    );
}
