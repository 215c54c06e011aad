//! View mode management for the TUI.
//!
//! The shell is either the full-screen terminal console or the portfolio
//! pages, with one page showing at a time.

use clap::ValueEnum;
use folio_core::Page;
use serde::{ Deserialize, Serialize };


/// View to open on startup.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum )]
#[serde( rename_all = "lowercase" )]
pub enum StartView {
    #[default]
    Terminal,
    Portfolio,
}


/// Current view mode of the application.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum ViewMode {
    /// Command console.
    #[default]
    Terminal,

    /// Portfolio pages, showing the given tab.
    Portfolio( Page ),
}


impl From<StartView> for ViewMode {
    fn from( start: StartView ) -> Self {
        match start {
            StartView::Terminal => ViewMode::Terminal,
            StartView::Portfolio => ViewMode::Portfolio( Page::Home ),
        }
    }
}


impl ViewMode {
    /// Where a console navigation request lands.
    pub fn for_page( page: Page ) -> Self {
        match page {
            Page::Portfolio => ViewMode::Portfolio( Page::Home ),
            page => ViewMode::Portfolio( page ),
        }
    }


    /// Returns the next page tab. The terminal has no tabs.
    pub fn next_tab( self ) -> Self {
        self.step( 1 )
    }


    /// Returns the previous page tab.
    pub fn prev_tab( self ) -> Self {
        self.step( Page::TABS.len() - 1 )
    }


    /// Header label.
    pub fn name( &self ) -> &'static str {
        match self {
            ViewMode::Terminal => "TERMINAL",
            ViewMode::Portfolio( page ) => match page {
                Page::Home | Page::Portfolio => "HOME",
                Page::About => "ABOUT",
                Page::Skills => "SKILLS",
                Page::Projects => "PROJECTS",
                Page::Contact => "CONTACT",
            },
        }
    }


    fn step( self, by: usize ) -> Self {
        match self {
            ViewMode::Terminal => ViewMode::Terminal,
            ViewMode::Portfolio( page ) => {
                let tabs = Page::TABS;
                let current = tabs.iter().position( |p| *p == page ).unwrap_or( 0 );
                ViewMode::Portfolio( tabs[ ( current + by ) % tabs.len() ] )
            }
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_tabs_cycle_both_ways() {
        let home = ViewMode::Portfolio( Page::Home );
        assert_eq!( home.next_tab(), ViewMode::Portfolio( Page::About ) );
        assert_eq!( home.prev_tab(), ViewMode::Portfolio( Page::Contact ) );

        let mut view = home;
        for _ in 0..Page::TABS.len() {
            view = view.next_tab();
        }
        assert_eq!( view, home );
    }


    #[test]
    fn test_terminal_has_no_tabs() {
        assert_eq!( ViewMode::Terminal.next_tab(), ViewMode::Terminal );
        assert_eq!( ViewMode::Terminal.prev_tab(), ViewMode::Terminal );
    }


    #[test]
    fn test_navigation_targets() {
        assert_eq!( ViewMode::for_page( Page::Portfolio ), ViewMode::Portfolio( Page::Home ) );
        assert_eq!( ViewMode::for_page( Page::Skills ), ViewMode::Portfolio( Page::Skills ) );
        assert_eq!( ViewMode::from( StartView::Portfolio ).name(), "HOME" );
    }
}
