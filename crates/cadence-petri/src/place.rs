//! Places hold tokens, one stack per color

use crate::error::{Error, Result};
use crate::identity::{ArcId, Color, PlaceId};
use crate::time::Date;
use serde::{Deserialize, Serialize};

/// An availability marker
///
/// `time` is how late the token already is when it is produced: the date its
/// outgoing arcs start counting from is `now - time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub time: Date,
}

impl Token {
    pub fn new(time: Date) -> Self {
        Self { time }
    }
}

/// A token multiset partitioned by color
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    id: PlaceId,
    tokens: Vec<Vec<Token>>,
    pub(crate) in_arcs: Vec<ArcId>,
    pub(crate) out_arcs: Vec<ArcId>,
}

impl Place {
    pub(crate) fn new(id: PlaceId, nb_colors: u16) -> Self {
        Self {
            id,
            tokens: vec![Vec::new(); nb_colors as usize],
            in_arcs: Vec::new(),
            out_arcs: Vec::new(),
        }
    }

    pub fn id(&self) -> PlaceId {
        self.id
    }

    /// Arcs ending in this place
    pub fn in_arcs(&self) -> &[ArcId] {
        &self.in_arcs
    }

    /// Arcs leaving this place
    pub fn out_arcs(&self) -> &[ArcId] {
        &self.out_arcs
    }

    /// Number of tokens of a color
    pub fn nb_tokens(&self, color: Color) -> usize {
        self.tokens.get(color.index()).map_or(0, Vec::len)
    }

    /// Total number of tokens over all colors
    pub fn total_tokens(&self) -> usize {
        self.tokens.iter().map(Vec::len).sum()
    }

    /// Append `n` tokens of `color`
    ///
    /// Returns true when the color count went from 0 to at least 1, meaning the
    /// outgoing arcs of that color must be activated.
    pub fn produce(&mut self, n: usize, color: Color, time: Date) -> Result<bool> {
        let nb_colors = self.tokens.len() as u16;
        let stack = self
            .tokens
            .get_mut(color.index())
            .ok_or(Error::InvalidColor { color, nb_colors })?;
        let was_empty = stack.is_empty();
        stack.extend(std::iter::repeat(Token::new(time)).take(n));
        Ok(was_empty && !stack.is_empty())
    }

    /// Remove `n` tokens of `color`, returning the time of the last removed one
    pub fn consume(&mut self, n: usize, color: Color) -> Result<Date> {
        let nb_colors = self.tokens.len() as u16;
        let stack = self
            .tokens
            .get_mut(color.index())
            .ok_or(Error::InvalidColor { color, nb_colors })?;
        if n == 0 || stack.len() < n {
            return Err(Error::NotEnoughTokens {
                place: self.id,
                color,
                requested: n,
                available: stack.len(),
            });
        }
        let mut time = 0;
        for token in stack.drain(..n) {
            time = token.time;
        }
        Ok(time)
    }

    /// Remove every token
    pub fn clear(&mut self) {
        self.tokens.iter_mut().for_each(Vec::clear);
    }

    /// Absorb the tokens of another place
    pub fn merge(&mut self, other: Place) {
        for (stack, extra) in self.tokens.iter_mut().zip(other.tokens) {
            stack.extend(extra);
        }
    }

    pub(crate) fn resize_colors(&mut self, nb_colors: u16) {
        self.tokens.resize(nb_colors as usize, Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_produce_reports_threshold_once() {
        let mut place = Place::new(PlaceId::new(0), 1);
        assert!(place.produce(1, Color::DEFAULT, 0).unwrap());
        assert!(!place.produce(2, Color::DEFAULT, 0).unwrap());
        assert_eq!(place.nb_tokens(Color::DEFAULT), 3);
    }

    #[test]
    fn test_consume_returns_token_time() {
        let mut place = Place::new(PlaceId::new(0), 1);
        place.produce(1, Color::DEFAULT, 12).unwrap();
        assert_eq!(place.consume(1, Color::DEFAULT).unwrap(), 12);
        assert_eq!(place.nb_tokens(Color::DEFAULT), 0);
    }

    #[test]
    fn test_consume_insufficient() {
        let mut place = Place::new(PlaceId::new(4), 1);
        place.produce(1, Color::DEFAULT, 0).unwrap();
        let err = place.consume(2, Color::DEFAULT).unwrap_err();
        assert!(matches!(
            err,
            Error::NotEnoughTokens {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(place.nb_tokens(Color::DEFAULT), 1);
    }

    #[test]
    fn test_invalid_color() {
        let mut place = Place::new(PlaceId::new(0), 2);
        assert!(place.produce(1, Color(1), 0).is_ok());
        assert!(matches!(
            place.produce(1, Color(2), 0),
            Err(Error::InvalidColor { nb_colors: 2, .. })
        ));
    }

    #[test]
    fn test_merge_places() {
        let mut a = Place::new(PlaceId::new(0), 2);
        let mut b = Place::new(PlaceId::new(1), 2);
        a.produce(1, Color(0), 0).unwrap();
        b.produce(2, Color(1), 5).unwrap();
        a.merge(b);
        assert_eq!(a.total_tokens(), 3);
        assert_eq!(a.nb_tokens(Color(1)), 2);
    }
}
