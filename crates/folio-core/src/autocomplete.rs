//! Prefix autocompletion over command names.


/// Names starting with `input`, compared case-insensitively.
///
/// Blank input yields no candidates.
pub fn candidates<'a>( input: &str, names: impl IntoIterator<Item = &'a str> ) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    let prefix = input.to_lowercase();
    names
        .into_iter()
        .filter( |name| name.to_lowercase().starts_with( &prefix ) )
        .map( str::to_string )
        .collect()
}


/// Candidate list with a wrapping selection cursor.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct Autocomplete {
    candidates: Vec<String>,
    selected: usize,
    visible: bool,
}


impl Autocomplete {
    pub fn new() -> Self {
        Self::default()
    }


    /// Recomputes candidates for `input`. The cursor returns to the first
    /// candidate whenever the candidate set changes.
    pub fn update<'a>( &mut self, input: &str, names: impl IntoIterator<Item = &'a str> ) {
        let next = candidates( input, names );
        if next != self.candidates {
            self.candidates = next;
            self.selected = 0;
        }
        self.visible = !self.candidates.is_empty();
    }


    /// Moves the cursor forward, wrapping to the first candidate.
    pub fn advance( &mut self ) {
        if !self.candidates.is_empty() {
            self.selected = ( self.selected + 1 ) % self.candidates.len();
        }
    }


    /// Moves the cursor backward, wrapping to the last candidate.
    pub fn retreat( &mut self ) {
        let len = self.candidates.len();
        if len > 0 {
            self.selected = ( self.selected + len - 1 ) % len;
        }
    }


    /// Hides the list until the next update.
    pub fn dismiss( &mut self ) {
        self.visible = false;
    }


    /// The highlighted candidate, if the list is showing.
    pub fn selected( &self ) -> Option<&str> {
        if !self.visible {
            return None;
        }
        self.candidates.get( self.selected ).map( String::as_str )
    }


    pub fn selected_index( &self ) -> usize {
        self.selected
    }


    pub fn candidates( &self ) -> &[String] {
        &self.candidates
    }


    pub fn is_visible( &self ) -> bool {
        self.visible
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NAMES: [&str; 7] = [ "about", "changesize", "clear", "coffee", "contact", "help", "home" ];


    #[test]
    fn test_prefix_match_is_case_insensitive() {
        assert_eq!( candidates( "CO", NAMES ), vec![ "coffee", "contact" ] );
        assert_eq!( candidates( "h", NAMES ), vec![ "help", "home" ] );
        assert!( candidates( "x", NAMES ).is_empty() );
    }


    #[test]
    fn test_blank_input_has_no_candidates() {
        assert!( candidates( "", NAMES ).is_empty() );
        assert!( candidates( "   ", NAMES ).is_empty() );
    }


    #[test]
    fn test_selection_wraps_both_ways() {
        let mut ac = Autocomplete::new();
        ac.update( "c", NAMES );
        assert_eq!( ac.candidates().len(), 4 );

        ac.retreat();
        assert_eq!( ac.selected(), Some( "contact" ) );
        ac.advance();
        assert_eq!( ac.selected(), Some( "changesize" ) );
    }


    #[test]
    fn test_selection_resets_when_set_changes() {
        let mut ac = Autocomplete::new();
        ac.update( "c", NAMES );
        ac.advance();
        ac.advance();
        assert_eq!( ac.selected_index(), 2 );

        // same candidate set keeps the cursor
        ac.update( "C", NAMES );
        assert_eq!( ac.selected_index(), 2 );

        ac.update( "co", NAMES );
        assert_eq!( ac.selected_index(), 0 );
    }


    #[test]
    fn test_dismiss_hides_until_update() {
        let mut ac = Autocomplete::new();
        ac.update( "he", NAMES );
        ac.dismiss();
        assert_eq!( ac.selected(), None );

        ac.update( "hel", NAMES );
        assert_eq!( ac.selected(), Some( "help" ) );
    }


    proptest! {
        #[test]
        fn prop_candidates_share_prefix( input in "[a-zA-Z ]{0,4}" ) {
            let found = candidates( &input, NAMES );
            for name in &found {
                prop_assert!( name.to_lowercase().starts_with( &input.to_lowercase() ) );
            }
            let any_match = !input.trim().is_empty()
                && NAMES.iter().any( |n| n.starts_with( &input.to_lowercase() ) );
            prop_assert_eq!( found.is_empty(), !any_match );
        }


        #[test]
        fn prop_advance_len_times_is_identity( input in "[a-z]{1,2}", start in 0usize..8 ) {
            let mut ac = Autocomplete::new();
            ac.update( &input, NAMES );
            let len = ac.candidates().len();
            for _ in 0..start {
                ac.advance();
            }
            let before = ac.selected_index();
            for _ in 0..len {
                ac.advance();
            }
            prop_assert_eq!( ac.selected_index(), before );
        }
    }
}
