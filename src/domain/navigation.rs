use crate::domain::MenuState;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListLayout {
    Flat,
    TwoColumn,
}

impl ListLayout {
    pub fn for_state(state: MenuState) -> Self {
        if state.is_two_column() {
            Self::TwoColumn
        } else {
            Self::Flat
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CursorMove {
    Up,
    Down,
    Left,
    Right,
}

/// Rows per column when `item_count` items are split over two columns.
pub fn two_column_rows(item_count: usize) -> usize {
    item_count.div_ceil(2)
}

/// Apply one directional move. Moves that would leave the list are no-ops.
pub fn navigate(layout: ListLayout, item_count: usize, cursor: usize, mv: CursorMove) -> usize {
    if item_count == 0 {
        return 0;
    }
    let cursor = cursor.min(item_count - 1);

    match layout {
        ListLayout::Flat => match mv {
            CursorMove::Up => cursor.saturating_sub(1),
            CursorMove::Down => (cursor + 1).min(item_count - 1),
            CursorMove::Left | CursorMove::Right => cursor,
        },
        ListLayout::TwoColumn => {
            let rows = two_column_rows(item_count);
            let in_left = cursor < rows;
            let (column_start, column_end) = if in_left {
                (0, rows - 1)
            } else {
                (rows, item_count - 1)
            };

            match mv {
                CursorMove::Up if cursor > column_start => cursor - 1,
                CursorMove::Down if cursor < column_end => cursor + 1,
                CursorMove::Left if !in_left => cursor - rows,
                CursorMove::Right if in_left && cursor + rows < item_count => cursor + rows,
                _ => cursor,
            }
        }
    }
}
