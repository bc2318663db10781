use std::sync::Arc;

use crate::engine::{Container, GameState, ItemCatalog};

/// Parses an array of string slices into a `GameState`.
///
/// Each string slice describes one container. Rows are separated by `/`, front
/// row first, and every character of a row is one slot. The container's slot count
/// is the row width and its depth is the number of rows.
///
/// A container may carry a lock prefix `L<n>:`, meaning it starts locked and opens
/// after `n` matches.
///
/// Valid cell characters are:
/// - `'.'`: an empty cell
/// - any ASCII letter or digit: an item whose name is that character
///
/// Any other character will result in an error.
///
/// # Arguments
/// * `s`: A slice of string slices, one per container, in board order.
///
/// # Returns
/// * `Ok(GameState)` with move and match counters at zero. Pre-existing triples are
///   left in place; run `process_all_matches` to clear them.
/// * `Err(String)` if:
///     - A container has no rows or a zero-width row.
///     - Rows of one container have different widths.
///     - The lock prefix is malformed.
///     - An unrecognized character is encountered.
///
/// # Examples
/// ```
/// use sort_resort::utils::board_from_str_array;
///
/// let state = board_from_str_array(&["AA.", "BB./C..", "L2:AB."]).unwrap();
/// assert_eq!(state.containers().len(), 3);
/// assert_eq!(state.container(1).max_rows(), 2);
/// assert!(state.container(2).is_locked());
/// assert_eq!(state.item_count(), 7);
///
/// assert!(board_from_str_array(&["A-B"]).is_err());
/// assert!(board_from_str_array(&["AAA/BB"]).is_err());
/// ```
pub fn board_from_str_array(s: &[&str]) -> Result<GameState, String> {
    let mut catalog = ItemCatalog::new();
    let mut containers = Vec::with_capacity(s.len());

    for (index, text) in s.iter().enumerate() {
        let (lock, body) = split_lock_prefix(text)
            .map_err(|e| format!("Container {}: {}", index, e))?;

        let rows: Vec<&str> = body.split('/').collect();
        let width = rows[0].chars().count();
        if width == 0 {
            return Err(format!("Container {} has an empty row", index));
        }
        for (r, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(format!(
                    "Container {} row {} has {} slots (expected {})",
                    index,
                    r,
                    row.chars().count(),
                    width
                ));
            }
        }

        let mut container = Container::new(width, rows.len(), lock.is_some(), lock.unwrap_or(0));
        for (r, row) in rows.iter().enumerate() {
            for (slot, ch) in row.chars().enumerate() {
                match ch {
                    '.' => {}
                    c if c.is_ascii_alphanumeric() => {
                        let id = catalog.intern(&c.to_string());
                        container.set(slot, r, Some(id));
                    }
                    _ => {
                        return Err(format!(
                            "Unrecognized character '{}' in container {} row {} slot {}",
                            ch, index, r, slot
                        ))
                    }
                }
            }
        }
        containers.push(container);
    }

    Ok(GameState::new(containers, Arc::new(catalog)))
}

/// Splits an optional `L<n>:` prefix off a container description.
fn split_lock_prefix(text: &str) -> Result<(Option<u32>, &str), String> {
    let Some(rest) = text.strip_prefix('L') else {
        return Ok((None, text));
    };
    let Some((count, body)) = rest.split_once(':') else {
        // A plain item named 'L' in the first slot.
        return Ok((None, text));
    };
    let required = count
        .parse::<u32>()
        .map_err(|_| format!("Invalid lock prefix 'L{}:'", count))?;
    Ok((Some(required), body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_from_str_array_valid() {
        let state = board_from_str_array(&["AA.", "BB.", "AB."]).unwrap();
        assert_eq!(state.containers().len(), 3);
        assert_eq!(state.item_count(), 6);
        assert_eq!(state.catalog().len(), 2);
        let c = state.container(2);
        assert_eq!(state.item_name(c.front_item(0).unwrap()), "A");
        assert_eq!(state.item_name(c.front_item(1).unwrap()), "B");
        assert!(c.front_item(2).is_none());
    }

    #[test]
    fn test_board_from_str_array_rows() {
        let state = board_from_str_array(&["A.B/CDE/..F"]).unwrap();
        let c = state.container(0);
        assert_eq!(c.slot_count(), 3);
        assert_eq!(c.max_rows(), 3);
        assert_eq!(state.item_name(c.get(2, 2).unwrap()), "F");
        assert!(c.get(0, 2).is_none());
    }

    #[test]
    fn test_board_from_str_array_lock_prefix() {
        let state = board_from_str_array(&["L3:ABC", "LA."]).unwrap();
        assert!(state.container(0).is_locked());
        assert_eq!(state.container(0).unlock_matches_required(), 3);
        // No colon: 'L' is just an item.
        assert!(!state.container(1).is_locked());
        assert_eq!(state.item_name(state.container(1).front_item(0).unwrap()), "L");
    }

    #[test]
    fn test_board_from_str_array_invalid_char() {
        let result = board_from_str_array(&["AB*"]);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Unrecognized character '*'"));
    }

    #[test]
    fn test_board_from_str_array_ragged_rows() {
        let result = board_from_str_array(&["ABC/AB"]);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("row 1 has 2 slots"));
    }

    #[test]
    fn test_board_from_str_array_bad_lock() {
        let result = board_from_str_array(&["Lx:ABC"]);
        assert!(result.unwrap_err().contains("Invalid lock prefix"));
    }

    #[test]
    fn test_board_from_str_array_empty_row() {
        assert!(board_from_str_array(&[""]).is_err());
    }

    #[test]
    fn test_board_from_str_array_empty_input() {
        let state = board_from_str_array(&[]).unwrap();
        assert!(state.containers().is_empty());
        assert!(state.is_complete());
    }
}
