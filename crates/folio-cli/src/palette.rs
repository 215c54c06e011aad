//! Colors for the light and dark themes.

use folio_core::Theme;
use ratatui::style::{ Color, Style };


#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub prompt: Color,
    pub selection: Color,
}


impl Palette {
    pub fn for_theme( theme: Theme ) -> Self {
        match theme {
            Theme::Dark => Self {
                background: Color::Black,
                text: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                prompt: Color::Green,
                selection: Color::Blue,
            },
            Theme::Light => Self {
                background: Color::White,
                text: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                prompt: Color::Magenta,
                selection: Color::LightBlue,
            },
        }
    }


    pub fn base( &self ) -> Style {
        Style::default().fg( self.text ).bg( self.background )
    }
}
