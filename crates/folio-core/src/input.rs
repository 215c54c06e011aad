//! Single-line text entry for the console prompt.


/// Editable line with a cursor kept on a char boundary.
#[derive( Debug, Clone, Default )]
pub struct InputBuffer {
    text: String,
    /// Byte offset into `text`.
    cursor: usize,
}


impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }


    /// Inserts `c` before the cursor.
    pub fn insert( &mut self, c: char ) {
        self.text.insert( self.cursor, c );
        self.cursor += c.len_utf8();
    }


    /// Removes the char before the cursor.
    pub fn backspace( &mut self ) {
        if let Some( start ) = self.prev_boundary() {
            self.text.replace_range( start..self.cursor, "" );
            self.cursor = start;
        }
    }


    /// Removes the char under the cursor.
    pub fn delete( &mut self ) {
        if let Some( end ) = self.next_boundary() {
            self.text.replace_range( self.cursor..end, "" );
        }
    }


    pub fn move_left( &mut self ) {
        if let Some( pos ) = self.prev_boundary() {
            self.cursor = pos;
        }
    }


    pub fn move_right( &mut self ) {
        if let Some( pos ) = self.next_boundary() {
            self.cursor = pos;
        }
    }


    pub fn move_home( &mut self ) {
        self.cursor = 0;
    }


    pub fn move_end( &mut self ) {
        self.cursor = self.text.len();
    }


    /// Replaces the contents and puts the cursor at the end.
    pub fn set( &mut self, text: &str ) {
        self.text = text.to_string();
        self.cursor = self.text.len();
    }


    /// Empties the buffer, returning what it held.
    pub fn take( &mut self ) -> String {
        self.cursor = 0;
        std::mem::take( &mut self.text )
    }


    pub fn clear( &mut self ) {
        self.text.clear();
        self.cursor = 0;
    }


    pub fn content( &self ) -> &str {
        &self.text
    }


    /// Cursor position in chars, for placing the terminal cursor.
    pub fn cursor_column( &self ) -> usize {
        self.text[ ..self.cursor ].chars().count()
    }


    pub fn is_empty( &self ) -> bool {
        self.text.is_empty()
    }


    fn prev_boundary( &self ) -> Option<usize> {
        self.text[ ..self.cursor ].char_indices().next_back().map( |( i, _ )| i )
    }


    fn next_boundary( &self ) -> Option<usize> {
        self.text[ self.cursor.. ]
            .chars()
            .next()
            .map( |c| self.cursor + c.len_utf8() )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn typed( s: &str ) -> InputBuffer {
        let mut buf = InputBuffer::new();
        s.chars().for_each( |c| buf.insert( c ) );
        buf
    }


    #[test]
    fn test_insert_and_backspace() {
        let mut buf = typed( "helpp" );
        buf.backspace();
        assert_eq!( buf.content(), "help" );
        assert_eq!( buf.cursor_column(), 4 );
    }


    #[test]
    fn test_editing_in_the_middle() {
        let mut buf = typed( "hlp" );
        buf.move_left();
        buf.move_left();
        buf.insert( 'e' );
        assert_eq!( buf.content(), "help" );

        buf.move_home();
        buf.delete();
        assert_eq!( buf.content(), "elp" );
        buf.move_end();
        assert_eq!( buf.cursor_column(), 3 );
    }


    #[test]
    fn test_multibyte_chars() {
        let mut buf = typed( "ké☕" );
        buf.move_left();
        buf.backspace();
        assert_eq!( buf.content(), "k☕" );
        buf.move_right();
        buf.move_right();
        assert_eq!( buf.cursor_column(), 2 );
    }


    #[test]
    fn test_set_and_take() {
        let mut buf = typed( "he" );
        buf.set( "help" );
        assert_eq!( buf.cursor_column(), 4 );
        assert_eq!( buf.take(), "help" );
        assert!( buf.is_empty() );
        buf.backspace();
        assert_eq!( buf.cursor_column(), 0 );
    }
}
