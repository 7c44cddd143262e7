use shared::domain::RecordId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropTarget {
    pub id: RecordId,
    pub top: f64,
    pub height: f64,
}

impl DropTarget {
    fn offset(&self, pointer_y: f64) -> f64 {
        pointer_y - self.top - self.height / 2.0
    }
}

/// The row the dragged one should be inserted before: among rows whose
/// midpoint lies below the pointer, the one closest to it. `None` means append.
pub fn insertion_target(targets: &[DropTarget], pointer_y: f64) -> Option<RecordId> {
    targets
        .iter()
        .map(|target| (target.offset(pointer_y), target.id))
        .filter(|(offset, _)| *offset < 0.0)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, id)| id)
}

/// Moves `dragged` in front of `before`, or to the end when `before` is `None`
/// or not part of `order`.
pub fn move_before(order: &[RecordId], dragged: RecordId, before: Option<RecordId>) -> Vec<RecordId> {
    let mut reordered: Vec<RecordId> = order.iter().copied().filter(|id| *id != dragged).collect();
    let position = before
        .filter(|target| *target != dragged)
        .and_then(|target| reordered.iter().position(|id| *id == target))
        .unwrap_or(reordered.len());
    reordered.insert(position, dragged);
    reordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<DropTarget> {
        [(1, 0.0), (2, 40.0), (3, 80.0)]
            .into_iter()
            .map(|(id, top)| DropTarget {
                id: RecordId(id),
                top,
                height: 40.0,
            })
            .collect()
    }

    #[test]
    fn picks_closest_row_whose_midpoint_is_below_pointer() {
        assert_eq!(insertion_target(&rows(), 5.0), Some(RecordId(1)));
        assert_eq!(insertion_target(&rows(), 45.0), Some(RecordId(2)));
        assert_eq!(insertion_target(&rows(), 65.0), Some(RecordId(3)));
    }

    #[test]
    fn pointer_below_every_midpoint_appends() {
        assert_eq!(insertion_target(&rows(), 110.0), None);
        assert_eq!(insertion_target(&[], 10.0), None);
    }

    #[test]
    fn move_before_reinserts_dragged_id() {
        let order = [RecordId(1), RecordId(2), RecordId(3)];
        assert_eq!(
            move_before(&order, RecordId(3), Some(RecordId(1))),
            vec![RecordId(3), RecordId(1), RecordId(2)]
        );
        assert_eq!(
            move_before(&order, RecordId(1), None),
            vec![RecordId(2), RecordId(3), RecordId(1)]
        );
        assert_eq!(
            move_before(&order, RecordId(2), Some(RecordId(2))),
            vec![RecordId(1), RecordId(3), RecordId(2)]
        );
    }
}
