//! Mesh slot storage in the tail region of the medium
//!
//! Meshes persist independently of the main settings record, in fixed-size
//! slots packed downward from [`layout::meshes_end`]: slot 0 occupies the
//! highest addresses and successive slots grow toward the record. The slot
//! count is derived from the medium capacity and the current grid
//! dimensions, never stored, so it adapts when either changes.
//!
//! Each slot carries its own CRC-16 trailer over the grid payload. Slot
//! failures are local: a bad slot read leaves the destination grid
//! untouched and never invalidates the main record.
//!
//! Slots are never relocated or compacted. A build change that shrinks the
//! slot region simply makes high-numbered slots unreachable; their bytes
//! stay where they are.

use crate::codec::RecordStream;
use crate::context::{MeshGrid, GRID_MAX_POINTS};
use crate::error::{Result, SettingsError};
use crate::layout;
use crate::medium::StorageMedium;
use crate::record::SettingsStore;

impl<M: StorageMedium> SettingsStore<M> {
    /// Number of mesh slots this medium can hold for the current build
    pub fn num_slots(&self) -> u8 {
        layout::num_slots(self.medium.capacity(), &self.profile)
    }

    /// Bounds-check a requested slot before any medium access
    fn check_slot(&self, slot: i8) -> Result<u8> {
        let available = self.num_slots();
        if slot < 0 || slot as u8 >= available {
            return Err(SettingsError::InvalidSlot { slot, available });
        }
        Ok(slot as u8)
    }

    /// Persist a mesh into `slot`
    ///
    /// Streams the leading `grid_points_x` x `grid_points_y` cells of the
    /// grid, then appends the slot checksum. An out-of-range slot fails
    /// before the medium is touched.
    pub fn store_mesh(&mut self, slot: i8, mesh: &MeshGrid) -> Result<()> {
        let slot = self.check_slot(slot)?;
        let offset = layout::slot_offset(self.medium.capacity(), &self.profile, slot);

        self.medium.open()?;
        let result = (|| {
            let mut s = RecordStream::new(&mut self.medium, offset);
            for x in 0..self.profile.grid_points_x as usize {
                for y in 0..self.profile.grid_points_y as usize {
                    s.write_f32(mesh.z_values[x][y])?;
                }
            }
            let crc = s.crc_value();
            s.write_raw(&crc.to_le_bytes())
        })();
        self.medium.close();
        result
    }

    /// Load a mesh from `slot` into `dest`
    ///
    /// The payload is staged and verified against the slot checksum before
    /// anything is committed, so a corrupt slot leaves `dest` untouched.
    /// The grid dimensions always come from the current build; slots carry
    /// no dimension bytes of their own.
    pub fn load_mesh(&mut self, slot: i8, dest: &mut MeshGrid) -> Result<()> {
        let slot = self.check_slot(slot)?;
        let offset = layout::slot_offset(self.medium.capacity(), &self.profile, slot);
        let gx = self.profile.grid_points_x as usize;
        let gy = self.profile.grid_points_y as usize;

        self.medium.open()?;
        let result = (|| {
            let mut s = RecordStream::new(&mut self.medium, offset);
            let mut staged = [[0.0f32; GRID_MAX_POINTS]; GRID_MAX_POINTS];
            for x in 0..gx {
                for y in 0..gy {
                    staged[x][y] = s.read_f32()?;
                }
            }
            let computed = s.crc_value();
            let mut crc_buf = [0u8; 2];
            s.read_raw(&mut crc_buf)?;
            let stored = u16::from_le_bytes(crc_buf);
            if computed != stored {
                return Err(SettingsError::ChecksumMismatch { stored, computed });
            }
            Ok(staged)
        })();
        self.medium.close();

        let staged = result?;
        dest.points_x = self.profile.grid_points_x;
        dest.points_y = self.profile.grid_points_y;
        dest.z_values = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BuildProfile;
    use crate::error::MediumError;
    use crate::medium::{MockMedium, MOCK_CAPACITY};

    fn store() -> SettingsStore<MockMedium> {
        SettingsStore::new(MockMedium::new(), BuildProfile::default())
    }

    fn sample_mesh(seed: f32) -> MeshGrid {
        let mut mesh = MeshGrid::flat(5, 5);
        for x in 0..5 {
            for y in 0..5 {
                mesh.z_values[x][y] = seed + (x * 5 + y) as f32 * 0.01;
            }
        }
        mesh
    }

    #[test]
    fn test_slot_roundtrip() {
        let mut store = store();
        let mesh = sample_mesh(0.1);
        store.store_mesh(2, &mesh).unwrap();

        let mut loaded = MeshGrid::flat(5, 5);
        store.load_mesh(2, &mut loaded).unwrap();
        assert_eq!(loaded.z_values, mesh.z_values);
        assert_eq!(loaded.points_x, 5);
        assert_eq!(loaded.points_y, 5);
    }

    #[test]
    fn test_slots_are_independent() {
        let mut store = store();
        let a = sample_mesh(0.1);
        let b = sample_mesh(-0.3);
        store.store_mesh(0, &a).unwrap();
        store.store_mesh(1, &b).unwrap();

        let mut loaded = MeshGrid::flat(5, 5);
        store.load_mesh(0, &mut loaded).unwrap();
        assert_eq!(loaded.z_values, a.z_values);
        store.load_mesh(1, &mut loaded).unwrap();
        assert_eq!(loaded.z_values, b.z_values);
    }

    #[test]
    fn test_out_of_range_slot_rejected_without_medium_access() {
        let mut store = store();
        let mesh = MeshGrid::flat(5, 5);
        let available = store.num_slots();

        assert_eq!(
            store.store_mesh(-1, &mesh),
            Err(SettingsError::InvalidSlot { slot: -1, available })
        );
        assert_eq!(
            store.store_mesh(available as i8, &mesh),
            Err(SettingsError::InvalidSlot { slot: available as i8, available })
        );
        assert_eq!(store.medium_mut().bytes_written(), 0);

        let mut dest = MeshGrid::flat(5, 5);
        assert_eq!(
            store.load_mesh(available as i8, &mut dest),
            Err(SettingsError::InvalidSlot { slot: available as i8, available })
        );
    }

    #[test]
    fn test_corrupt_slot_leaves_destination_untouched() {
        let mut store = store();
        store.store_mesh(0, &sample_mesh(0.2)).unwrap();

        let offset = layout::slot_offset(MOCK_CAPACITY, store.profile(), 0);
        store.medium_mut().inject_corruption(offset + 10, 2);

        let mut dest = sample_mesh(0.9);
        let before = dest.clone();
        assert!(matches!(
            store.load_mesh(0, &mut dest),
            Err(SettingsError::ChecksumMismatch { .. })
        ));
        assert_eq!(dest, before);
    }

    #[test]
    fn test_blank_slot_fails_checksum() {
        let mut store = store();
        let mut dest = MeshGrid::flat(5, 5);
        assert!(matches!(
            store.load_mesh(0, &mut dest),
            Err(SettingsError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_slots_do_not_disturb_record() {
        use crate::context::SettingsContext;
        use crate::record::NullHook;

        let profile = BuildProfile::default();
        let mut store = store();
        let mut ctx = SettingsContext::defaults(&profile);
        ctx.motion.acceleration = 2222.0;
        store.save(&ctx).unwrap();

        // Fill every slot, then make sure the record still validates
        for slot in 0..store.num_slots() as i8 {
            store.store_mesh(slot, &sample_mesh(slot as f32 * 0.01)).unwrap();
        }
        let mut loaded = SettingsContext::defaults(&profile);
        store.load(&mut loaded, &mut NullHook).unwrap();
        assert_eq!(loaded.motion.acceleration, 2222.0);
    }

    #[test]
    fn test_medium_unavailable_propagates() {
        let mut store = store();
        store.medium_mut().fail_next_open();
        assert_eq!(
            store.store_mesh(0, &MeshGrid::flat(5, 5)),
            Err(SettingsError::Medium(MediumError::Unavailable))
        );
    }
}
