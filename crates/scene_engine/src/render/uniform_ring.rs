//! Per-draw uniform staging
//!
//! Each draw gets its own slot for the frame, so the value handed to the
//! device stays untouched until the ring is reset at the next frame. The
//! device buffer itself is written with discard semantics.

use bytemuck::Pod;

use crate::render::api::{BackendResult, BufferDesc, BufferHandle, GraphicsDevice};

/// Growable ring of uniform blocks backed by one dynamic buffer
pub struct UniformRing<T: Pod> {
    buffer: BufferHandle,
    slots: Vec<T>,
    cursor: usize,
}

impl<T: Pod> UniformRing<T> {
    /// Create the dynamic uniform buffer for `T`
    pub fn new(device: &mut dyn GraphicsDevice, name: &str) -> BackendResult<Self> {
        let buffer = device.create_buffer(&BufferDesc::dynamic_uniform(name, std::mem::size_of::<T>()), None)?;
        Ok(Self {
            buffer,
            slots: Vec::new(),
            cursor: 0,
        })
    }

    /// Store `value` in a fresh slot and upload it
    pub fn allocate(&mut self, device: &mut dyn GraphicsDevice, value: T) -> BackendResult<&T> {
        if self.cursor == self.slots.len() {
            self.slots.push(value);
        } else {
            self.slots[self.cursor] = value;
        }
        let slot = self.cursor;
        self.cursor += 1;

        device.write_buffer_discard(self.buffer, bytemuck::bytes_of(&self.slots[slot]))?;
        Ok(&self.slots[slot])
    }

    /// Make every slot available again; called once per frame
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Slots handed out since the last reset
    pub fn allocated(&self) -> usize {
        self.cursor
    }

    /// Slots the ring has grown to
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Backing device buffer
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// Release the device buffer
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        device.release_buffer(self.buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::RecordingDevice;

    #[test]
    fn test_allocate_writes_and_grows() {
        let mut device = RecordingDevice::new();
        let mut ring = UniformRing::<[f32; 4]>::new(&mut device, "test").unwrap();

        assert_eq!(*ring.allocate(&mut device, [1.0, 2.0, 3.0, 4.0]).unwrap(), [1.0, 2.0, 3.0, 4.0]);
        ring.allocate(&mut device, [5.0; 4]).unwrap();
        assert_eq!(ring.allocated(), 2);
        assert_eq!(ring.capacity(), 2);

        let recorded = device.buffer(ring.buffer()).unwrap();
        assert_eq!(recorded.writes, 2);
        assert_eq!(recorded.data, bytemuck::bytes_of(&[5.0_f32; 4]));
    }

    #[test]
    fn test_reset_reuses_slots() {
        let mut device = RecordingDevice::new();
        let mut ring = UniformRing::<[f32; 4]>::new(&mut device, "test").unwrap();
        ring.allocate(&mut device, [1.0; 4]).unwrap();
        ring.allocate(&mut device, [2.0; 4]).unwrap();
        ring.reset();
        ring.allocate(&mut device, [3.0; 4]).unwrap();
        assert_eq!(ring.allocated(), 1);
        assert_eq!(ring.capacity(), 2);

        ring.destroy(&mut device);
        assert_eq!(device.buffer_count(), 0);
    }
}
