//! Virtual input device backend.
//!
//! [`InputBackend`] and [`VirtualKeyboard`] are the seam between the press
//! sequencer and the kernel. [`UinputBackend`] talks to `/dev/uinput`
//! through `evdev`; tests plug in a recording backend instead.

use crate::error::{EmitKeyError, Result};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, EventType, InputEvent, InputId, Key};
use tracing::{debug, info, warn};

pub const DEFAULT_DEVICE_NAME: &str = "Emit key";
pub const DEFAULT_VENDOR_ID: u16 = 0x1234;
pub const DEFAULT_PRODUCT_ID: u16 = 0x5678;

/// Name and USB ids the virtual device is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
        }
    }
}

/// An event written to a virtual keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Key { code: Key, pressed: bool },
    /// Marks the end of a batch of events (`SYN_REPORT`).
    SynReport,
}

impl DeviceEvent {
    pub fn key_down(code: Key) -> Self {
        Self::Key {
            code,
            pressed: true,
        }
    }

    pub fn key_up(code: Key) -> Self {
        Self::Key {
            code,
            pressed: false,
        }
    }

    pub fn to_input_event(self) -> InputEvent {
        match self {
            Self::Key { code, pressed } => {
                InputEvent::new(EventType::KEY, code.code(), i32::from(pressed))
            }
            Self::SynReport => InputEvent::new(EventType::SYNCHRONIZATION, 0, 0),
        }
    }
}

/// Creates virtual keyboards.
pub trait InputBackend {
    type Device: VirtualKeyboard;

    /// Advertise `code` on the next device. Registering a code twice is a
    /// no-op.
    fn register_capability(&mut self, code: Key);

    fn create(&mut self, identity: &DeviceIdentity) -> Result<Self::Device>;
}

/// A created virtual keyboard.
pub trait VirtualKeyboard {
    fn inject(&mut self, event: DeviceEvent) -> Result<()>;

    fn destroy(self) -> Result<()>;
}

/// Linux uinput backend.
pub struct UinputBackend {
    keys: AttributeSet<Key>,
}

impl Default for UinputBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl UinputBackend {
    pub fn new() -> Self {
        Self {
            keys: AttributeSet::new(),
        }
    }
}

impl InputBackend for UinputBackend {
    type Device = UinputKeyboard;

    fn register_capability(&mut self, code: Key) {
        self.keys.insert(code);
    }

    fn create(&mut self, identity: &DeviceIdentity) -> Result<UinputKeyboard> {
        let mut device = VirtualDeviceBuilder::new()
            .map_err(|e| EmitKeyError::backend("open /dev/uinput", e))?
            .name(identity.name.as_str())
            .input_id(InputId::new(
                BusType::BUS_USB,
                identity.vendor_id,
                identity.product_id,
                0,
            ))
            .with_keys(&self.keys)
            .map_err(|e| EmitKeyError::backend("register key capabilities", e))?
            .build()
            .map_err(|e| EmitKeyError::backend("create device", e))?;

        match device.enumerate_dev_nodes_blocking() {
            Ok(nodes) => {
                for path in nodes.flatten() {
                    debug!("Virtual device available as {}", path.display());
                }
            }
            Err(e) => debug!("Could not enumerate device nodes: {}", e),
        }

        info!(
            "Created virtual device '{}' ({:04x}:{:04x})",
            identity.name, identity.vendor_id, identity.product_id
        );

        Ok(UinputKeyboard {
            device,
            pending: Vec::new(),
        })
    }
}

/// A uinput keyboard. Key events are buffered until the next
/// [`DeviceEvent::SynReport`], which writes the batch.
pub struct UinputKeyboard {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl VirtualKeyboard for UinputKeyboard {
    fn inject(&mut self, event: DeviceEvent) -> Result<()> {
        match event {
            DeviceEvent::Key { .. } => {
                self.pending.push(event.to_input_event());
                Ok(())
            }
            // `emit` terminates the batch with SYN_REPORT itself.
            DeviceEvent::SynReport => {
                let batch = std::mem::take(&mut self.pending);
                self.device
                    .emit(&batch)
                    .map_err(|e| EmitKeyError::backend("write events", e))
            }
        }
    }

    fn destroy(self) -> Result<()> {
        // Dropping the device closes the uinput fd, and the kernel destroys
        // the device when its fd is closed.
        drop(self.device);
        Ok(())
    }
}

/// Owns a device and destroys it exactly once, either through
/// [`DeviceGuard::destroy`] or on drop.
pub struct DeviceGuard<D: VirtualKeyboard> {
    device: Option<D>,
}

impl<D: VirtualKeyboard> DeviceGuard<D> {
    pub fn new(device: D) -> Self {
        Self {
            device: Some(device),
        }
    }

    pub fn inject(&mut self, event: DeviceEvent) -> Result<()> {
        match self.device.as_mut() {
            Some(device) => device.inject(event),
            None => Err(EmitKeyError::backend(
                "write events",
                "device already destroyed",
            )),
        }
    }

    /// Destroy the device. Later calls do nothing.
    pub fn destroy(&mut self) -> Result<()> {
        match self.device.take() {
            Some(device) => {
                debug!("Destroying virtual device");
                device.destroy()
            }
            None => Ok(()),
        }
    }
}

impl<D: VirtualKeyboard> Drop for DeviceGuard<D> {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            warn!("Failed to destroy virtual device: {}", e);
        }
    }
}
