use super::{
    access::CharacteristicAccess,
    characteristic::Characteristic,
    path::{AttributePath, PathKind},
    properties::AttributeFlags,
};
use uuid::Uuid;

#[derive(Debug)]
pub struct Service {
    path: AttributePath,
    pub uuid: Uuid,
    pub primary: bool,
    characteristics: Vec<Characteristic>,
}

impl Service {
    pub(crate) fn new(path: AttributePath, uuid: Uuid, primary: bool) -> Self {
        Service {
            path,
            uuid,
            primary,
            characteristics: Vec::new(),
        }
    }

    pub fn path(&self) -> &AttributePath {
        &self.path
    }

    /// Appends a characteristic and returns it; its path is `<service>/char<index>`.
    pub fn add_characteristic<H: CharacteristicAccess + 'static>(
        &mut self,
        uuid: Uuid,
        flags: impl Into<AttributeFlags>,
        handler: H,
    ) -> &mut Characteristic {
        let index = self.characteristics.len();
        let path = self.path.child(PathKind::Characteristic, index);
        self.characteristics.push(Characteristic::new(
            path,
            self.path.clone(),
            uuid,
            flags.into(),
            Box::new(handler),
        ));
        &mut self.characteristics[index]
    }

    pub fn characteristics(&self) -> &[Characteristic] {
        &self.characteristics
    }

    pub(crate) fn characteristics_mut(&mut self) -> &mut [Characteristic] {
        &mut self.characteristics
    }

    pub fn get_characteristic_paths(&self) -> Vec<AttributePath> {
        self.characteristics
            .iter()
            .map(|c| c.path().clone())
            .collect()
    }
}
