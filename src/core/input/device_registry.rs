//=========================================================================
// Input Device Registry
//=========================================================================
//
// Maps OS device indices to stable logical handles for hot-pluggable
// input devices.
//
// The OS recycles its indices after a detach; logical handles never are.
// Raw device input arrives tagged with an OS instance id whose ordering
// relative to attach/detach is not guaranteed, so every lookup tolerates
// ids it has never seen.
//
// Lives on the consumer thread. Changes are announced to the producer
// through the render event channel.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;

use crossbeam_channel::Sender;
use log::{debug, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::event::{DeviceHandle, DeviceInput};
use crate::core::bridge::RenderEvent;

//=== DeviceEntry =========================================================

#[derive(Debug, Clone)]
struct DeviceEntry {
    handle: DeviceHandle,
    instance_id: u64,
    name: String,
}

//=== InputDeviceRegistry =================================================

/// OS index → logical handle mapping for attached devices.
pub struct InputDeviceRegistry {
    devices: HashMap<u32, DeviceEntry>,
    next_handle: u64,
    events: Sender<RenderEvent>,
}

impl InputDeviceRegistry {
    pub fn new(events: Sender<RenderEvent>) -> Self {
        Self {
            devices: HashMap::new(),
            next_handle: 1,
            events,
        }
    }

    //--- Hot-plug ---------------------------------------------------------

    /// Registers a newly attached device.
    ///
    /// Duplicate notifications for an index already mapped are ignored and
    /// return `None`.
    pub fn on_device_added(
        &mut self,
        os_index: u32,
        instance_id: u64,
        name: impl Into<String>,
    ) -> Option<DeviceHandle> {
        if self.devices.contains_key(&os_index) {
            debug!(target: "platform::input", "duplicate attach for OS index {} ignored", os_index);
            return None;
        }

        let handle = DeviceHandle(self.next_handle);
        self.next_handle += 1;

        let name = name.into();
        info!(target: "platform::input", "{} attached at OS index {}: {}", handle, os_index, name);

        self.devices.insert(
            os_index,
            DeviceEntry {
                handle,
                instance_id,
                name: name.clone(),
            },
        );
        self.notify(RenderEvent::DeviceAdded { handle, name });
        Some(handle)
    }

    /// Unregisters a detached device. Unknown indices are ignored.
    pub fn on_device_removed(&mut self, os_index: u32) -> Option<DeviceHandle> {
        let Some(entry) = self.devices.remove(&os_index) else {
            debug!(target: "platform::input", "detach for unmapped OS index {} ignored", os_index);
            return None;
        };

        info!(target: "platform::input", "{} detached from OS index {}", entry.handle, os_index);
        self.notify(RenderEvent::DeviceRemoved {
            handle: entry.handle,
        });
        Some(entry.handle)
    }

    //--- Lookup -----------------------------------------------------------

    /// Resolves the instance id carried by a raw OS input event.
    pub fn lookup_instance(&self, instance_id: u64) -> Option<DeviceHandle> {
        self.devices
            .values()
            .find(|entry| entry.instance_id == instance_id)
            .map(|entry| entry.handle)
    }

    pub fn lookup_index(&self, os_index: u32) -> Option<DeviceHandle> {
        self.devices.get(&os_index).map(|entry| entry.handle)
    }

    pub fn name(&self, handle: DeviceHandle) -> Option<&str> {
        self.devices
            .values()
            .find(|entry| entry.handle == handle)
            .map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    //--- Forwarding -------------------------------------------------------

    /// Forwards raw device input to the producer.
    ///
    /// Returns `false` (dropping the input) when the instance id does not
    /// belong to an attached device.
    pub fn forward_input(&self, instance_id: u64, input: DeviceInput) -> bool {
        match self.lookup_instance(instance_id) {
            Some(handle) => {
                self.notify(RenderEvent::DeviceInput { handle, input });
                true
            }
            None => {
                trace!(
                    target: "platform::input",
                    "input from unknown device instance {} dropped",
                    instance_id
                );
                false
            }
        }
    }

    fn notify(&self, event: RenderEvent) {
        if self.events.send(event).is_err() {
            warn!(target: "platform::input", "Channel disconnected, dropping device event");
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
