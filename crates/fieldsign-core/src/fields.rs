//! Signature field list and click-to-place editing
//!
//! Fields are stored in fractional page coordinates so the same record works
//! at any render scale. Ids come from a monotonic counter and are never
//! reused; removing a field is the only way it leaves the list.

use serde::{Deserialize, Serialize};

use crate::coords::{self, FracRect};

pub type FieldId = u64;

/// Default size of a newly placed field, as a fraction of the page
pub const DEFAULT_FIELD_WIDTH: f64 = 0.15;
pub const DEFAULT_FIELD_HEIGHT: f64 = 0.05;

/// A rectangular region on a page designated to receive a signature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureField {
    pub id: FieldId,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SignatureField {
    pub fn rect(&self) -> FracRect {
        FracRect::new(self.x, self.y, self.width, self.height)
    }

    pub fn set_rect(&mut self, rect: FracRect) {
        let rect = rect.clamped();
        self.x = rect.x;
        self.y = rect.y;
        self.width = rect.width;
        self.height = rect.height;
    }
}

/// Placement arm state: an explicit user action arms the editor, the next
/// canvas pointer-down while armed places a field and disarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum PlacementArm {
    #[default]
    Idle,
    Armed,
}

/// Editor over the ordered field list of one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldEditor {
    next_id: FieldId,
    fields: Vec<SignatureField>,
    #[serde(skip)]
    arm: PlacementArm,
}

impl FieldEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an editor from a persisted field list, keeping the id counter
    /// ahead of every existing id. Rects are re-clamped on the way in.
    pub fn from_fields(fields: Vec<SignatureField>) -> Self {
        let fields: Vec<SignatureField> = fields
            .into_iter()
            .map(|mut field| {
                field.set_rect(field.rect());
                field
            })
            .collect();
        let next_id = fields.iter().map(|f| f.id + 1).max().unwrap_or(0);
        Self {
            next_id,
            fields,
            arm: PlacementArm::Idle,
        }
    }

    /// Arm the placement mode; the next canvas pointer-down places a field
    pub fn arm_placement(&mut self) {
        self.arm = PlacementArm::Armed;
    }

    pub fn disarm(&mut self) {
        self.arm = PlacementArm::Idle;
    }

    pub fn is_armed(&self) -> bool {
        self.arm == PlacementArm::Armed
    }

    /// Handle a canvas pointer-down while placing.
    ///
    /// Returns the id of the new field when the editor was armed, or `None`
    /// when the click is ignored. The field gets the default size, centered
    /// on the click point and clamped into the page; placing disarms.
    pub fn pointer_down(
        &mut self,
        page: u32,
        px: f64,
        py: f64,
        canvas_width: f64,
        canvas_height: f64,
    ) -> Option<FieldId> {
        if self.arm != PlacementArm::Armed {
            return None;
        }
        let (fx, fy) = coords::to_fraction(px, py, canvas_width, canvas_height);
        let rect = FracRect::new(
            fx - DEFAULT_FIELD_WIDTH / 2.0,
            fy - DEFAULT_FIELD_HEIGHT / 2.0,
            DEFAULT_FIELD_WIDTH,
            DEFAULT_FIELD_HEIGHT,
        )
        .clamped();

        let id = self.next_id;
        self.next_id += 1;
        self.fields.push(SignatureField {
            id,
            page,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
        self.arm = PlacementArm::Idle;
        Some(id)
    }

    /// Remove a field by id; synchronous, no confirmation
    pub fn remove_field(&mut self, id: FieldId) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.id != id);
        self.fields.len() != before
    }

    pub fn get_field(&self, id: FieldId) -> Option<&SignatureField> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub(crate) fn get_field_mut(&mut self, id: FieldId) -> Option<&mut SignatureField> {
        self.fields.iter_mut().find(|f| f.id == id)
    }

    pub fn fields(&self) -> &[SignatureField] {
        &self.fields
    }

    pub fn fields_for_page(&self, page: u32) -> Vec<&SignatureField> {
        self.fields.iter().filter(|f| f.page == page).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Find the topmost field under a canvas point on the given page
    pub fn hit_test(
        &self,
        page: u32,
        px: f64,
        py: f64,
        canvas_width: f64,
        canvas_height: f64,
    ) -> Option<FieldId> {
        let (fx, fy) = coords::to_fraction(px, py, canvas_width, canvas_height);
        self.fields
            .iter()
            .rev()
            .find(|f| f.page == page && f.rect().contains(fx, fy))
            .map(|f| f.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_requires_arming() {
        let mut editor = FieldEditor::new();
        assert_eq!(editor.pointer_down(0, 400.0, 300.0, 800.0, 600.0), None);
        assert!(editor.is_empty());
    }

    #[test]
    fn test_place_centers_on_click_and_disarms() {
        let mut editor = FieldEditor::new();
        editor.arm_placement();
        let id = editor
            .pointer_down(0, 400.0, 300.0, 800.0, 600.0)
            .unwrap();
        assert!(!editor.is_armed());

        let field = editor.get_field(id).unwrap();
        assert_eq!(field.page, 0);
        assert!((field.x - (0.5 - 0.075)).abs() < 1e-9);
        assert!((field.y - (0.5 - 0.025)).abs() < 1e-9);
        assert_eq!(field.width, DEFAULT_FIELD_WIDTH);
        assert_eq!(field.height, DEFAULT_FIELD_HEIGHT);
    }

    #[test]
    fn test_place_near_corner_is_clamped() {
        let mut editor = FieldEditor::new();
        editor.arm_placement();
        let id = editor.pointer_down(0, 799.0, 599.0, 800.0, 600.0).unwrap();
        let field = editor.get_field(id).unwrap();
        assert!(field.rect().in_bounds());
        assert!((field.x + field.width - 1.0).abs() < 1e-9);
        assert!((field.y + field.height - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_second_click_is_ignored_until_rearmed() {
        let mut editor = FieldEditor::new();
        editor.arm_placement();
        editor.pointer_down(0, 100.0, 100.0, 800.0, 600.0);
        assert_eq!(editor.pointer_down(0, 200.0, 200.0, 800.0, 600.0), None);
        assert_eq!(editor.fields().len(), 1);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut editor = FieldEditor::new();
        editor.arm_placement();
        let first = editor.pointer_down(0, 100.0, 100.0, 800.0, 600.0).unwrap();
        editor.remove_field(first);
        editor.arm_placement();
        let second = editor.pointer_down(0, 100.0, 100.0, 800.0, 600.0).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_from_fields_continues_id_sequence() {
        let mut editor = FieldEditor::from_fields(vec![SignatureField {
            id: 7,
            page: 0,
            x: 0.1,
            y: 0.1,
            width: 0.15,
            height: 0.05,
        }]);
        editor.arm_placement();
        let id = editor.pointer_down(1, 10.0, 10.0, 800.0, 600.0).unwrap();
        assert_eq!(id, 8);
    }

    #[test]
    fn test_remove_field() {
        let mut editor = FieldEditor::new();
        editor.arm_placement();
        let id = editor.pointer_down(0, 100.0, 100.0, 800.0, 600.0).unwrap();
        assert!(editor.remove_field(id));
        assert!(!editor.remove_field(id));
        assert!(editor.is_empty());
    }

    #[test]
    fn test_fields_for_page() {
        let mut editor = FieldEditor::new();
        for (page, px) in [(0u32, 100.0), (0, 300.0), (2, 500.0)] {
            editor.arm_placement();
            editor.pointer_down(page, px, 100.0, 800.0, 600.0);
        }
        assert_eq!(editor.fields_for_page(0).len(), 2);
        assert_eq!(editor.fields_for_page(1).len(), 0);
        assert_eq!(editor.fields_for_page(2).len(), 1);
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut editor = FieldEditor::new();
        editor.arm_placement();
        let lower = editor.pointer_down(0, 400.0, 300.0, 800.0, 600.0).unwrap();
        editor.arm_placement();
        let upper = editor.pointer_down(0, 400.0, 300.0, 800.0, 600.0).unwrap();
        assert_ne!(lower, upper);
        assert_eq!(editor.hit_test(0, 400.0, 300.0, 800.0, 600.0), Some(upper));
        assert_eq!(editor.hit_test(1, 400.0, 300.0, 800.0, 600.0), None);
    }

    #[test]
    fn test_serde_roundtrip_preserves_fields() {
        let mut editor = FieldEditor::new();
        editor.arm_placement();
        editor.pointer_down(0, 400.0, 300.0, 800.0, 600.0);

        let json = serde_json::to_string(editor.fields()).unwrap();
        let fields: Vec<SignatureField> = serde_json::from_str(&json).unwrap();
        let restored = FieldEditor::from_fields(fields);
        assert_eq!(restored.fields(), editor.fields());
    }
}
