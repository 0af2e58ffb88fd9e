//! Session-scoped shopping cart.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bookbazaar_core::BookId;

/// Ephemeral per-session cart: book id -> requested quantity.
///
/// Lives only in the session store; created empty on first add, cleared in
/// one step on successful checkout, dropped with the session. The map is
/// ordered, so checkout processes line items in ascending book-id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(BTreeMap<BookId, u32>);

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add one unit of a book.
    pub fn add(&mut self, book_id: BookId) {
        *self.0.entry(book_id).or_insert(0) += 1;
    }

    /// Set the quantity for a book; zero removes the line.
    pub fn set(&mut self, book_id: BookId, quantity: u32) {
        if quantity == 0 {
            self.0.remove(&book_id);
        } else {
            self.0.insert(book_id, quantity);
        }
    }

    /// Remove a book entirely.
    ///
    /// Returns `true` if the book was in the cart.
    pub fn remove(&mut self, book_id: BookId) -> bool {
        self.0.remove(&book_id).is_some()
    }

    /// Quantity for a book, zero if absent.
    #[must_use]
    pub fn quantity(&self, book_id: BookId) -> u32 {
        self.0.get(&book_id).copied().unwrap_or(0)
    }

    /// Total units across all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.0.values().sum()
    }

    /// Number of distinct books.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Line items in ascending book-id order.
    pub fn iter(&self) -> impl Iterator<Item = (BookId, u32)> + '_ {
        self.0.iter().map(|(id, qty)| (*id, *qty))
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = (&'a BookId, &'a u32);
    type IntoIter = std::collections::btree_map::Iter<'a, BookId, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_accumulates() {
        let mut cart = Cart::new();
        cart.add(BookId::new(1));
        cart.add(BookId::new(1));
        cart.add(BookId::new(2));
        assert_eq!(cart.quantity(BookId::new(1)), 2);
        assert_eq!(cart.quantity(BookId::new(2)), 1);
        assert_eq!(cart.count(), 3);
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_set_zero_removes() {
        let mut cart = Cart::new();
        cart.add(BookId::new(1));
        cart.set(BookId::new(1), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let mut cart = Cart::new();
        cart.add(BookId::new(1));
        cart.set(BookId::new(1), 5);
        assert_eq!(cart.quantity(BookId::new(1)), 5);
    }

    #[test]
    fn test_remove_reports_presence() {
        let mut cart = Cart::new();
        cart.add(BookId::new(3));
        assert!(cart.remove(BookId::new(3)));
        assert!(!cart.remove(BookId::new(3)));
    }

    #[test]
    fn test_iteration_is_id_ordered() {
        let mut cart = Cart::new();
        cart.add(BookId::new(9));
        cart.add(BookId::new(2));
        cart.add(BookId::new(5));
        let ids: Vec<i32> = cart.iter().map(|(id, _)| id.as_i32()).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_serde_roundtrip_through_session_json() {
        let mut cart = Cart::new();
        cart.add(BookId::new(7));
        cart.set(BookId::new(12), 3);

        // tower-sessions stores values as JSON
        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }
}
