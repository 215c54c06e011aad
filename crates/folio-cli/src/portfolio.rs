//! Static portfolio pages shown outside the terminal view.

use folio_core::Page;
use ratatui::prelude::*;

use crate::palette::Palette;


struct Project {
    name: &'static str,
    description: &'static str,
    tech: &'static [&'static str],
    github: &'static str,
}


struct Profile {
    name: &'static str,
    title: &'static str,
    bio: &'static str,
    skills: &'static [&'static str],
    projects: &'static [Project],
    email: &'static str,
    github: &'static str,
    linkedin: &'static str,
}


const PROFILE: Profile = Profile {
    name: "Kusal Waidyanayake",
    title: "Full Stack Developer & AI/ML Enthusiast",
    bio: "Passionate developer with experience in modern web technologies.",
    skills: &[ "React", "JavaScript", "Node.js", "Python", "CSS", "C#" ],
    projects: &[
        Project {
            name: "E-commerce Platform",
            description: "Full-stack e-commerce solution with React and Node.js",
            tech: &[ "React", "Node.js", "MongoDB" ],
            github: "https://github.com/username/ecommerce",
        },
        Project {
            name: "Task Manager App",
            description: "Productivity app with real-time updates",
            tech: &[ "React", "Firebase", "Tailwind" ],
            github: "https://github.com/username/taskmanager",
        },
    ],
    email: "your.email@example.com",
    github: "https://github.com/username",
    linkedin: "https://linkedin.com/in/username",
};


/// Body text for a portfolio page.
pub fn page_lines( page: Page, palette: &Palette ) -> Vec<Line<'static>> {
    let heading = |text: &str| {
        Line::from( Span::styled( text.to_string(), Style::default().fg( palette.accent ).bold() ) )
    };
    let muted = |text: String| Line::from( Span::styled( text, Style::default().fg( palette.muted ) ) );

    let mut lines = Vec::new();
    match page {
        Page::Home | Page::Portfolio => {
            lines.push( heading( PROFILE.name ) );
            lines.push( Line::from( PROFILE.title ) );
            lines.push( Line::default() );
            lines.push( Line::from( PROFILE.bio ) );
            lines.push( Line::default() );
            lines.push( muted( "[Tab] browse pages  [t] open the terminal".to_string() ) );
        }
        Page::About => {
            lines.push( heading( "About" ) );
            lines.push( Line::from( PROFILE.bio ) );
            lines.push( Line::default() );
            lines.push( muted( "Type \"experience\" in the terminal for the full history.".to_string() ) );
        }
        Page::Skills => {
            lines.push( heading( "Skills" ) );
            for skill in PROFILE.skills {
                lines.push( Line::from( format!( "  • {}", skill ) ) );
            }
        }
        Page::Projects => {
            lines.push( heading( "Projects" ) );
            for project in PROFILE.projects {
                lines.push( Line::default() );
                lines.push( Line::from( Span::styled( project.name, Style::default().bold() ) ) );
                lines.push( Line::from( format!( "  {}", project.description ) ) );
                lines.push( muted( format!( "  {}", project.tech.join( " · " ) ) ) );
                lines.push( muted( format!( "  {}", project.github ) ) );
            }
        }
        Page::Contact => {
            lines.push( heading( "Contact" ) );
            lines.push( Line::from( format!( "  Email:    {}", PROFILE.email ) ) );
            lines.push( Line::from( format!( "  GitHub:   {}", PROFILE.github ) ) );
            lines.push( Line::from( format!( "  LinkedIn: {}", PROFILE.linkedin ) ) );
        }
    }
    lines
}


#[cfg( test )]
mod tests {
    use super::*;
    use folio_core::Theme;


    fn text( page: Page ) -> String {
        let palette = Palette::for_theme( Theme::Dark );
        page_lines( page, &palette )
            .iter()
            .map( |line| line.spans.iter().map( |s| s.content.as_ref() ).collect::<String>() )
            .collect::<Vec<_>>()
            .join( "\n" )
    }


    #[test]
    fn test_every_tab_has_content() {
        for page in Page::TABS {
            assert!( !text( page ).trim().is_empty(), "{:?}", page );
        }
    }


    #[test]
    fn test_projects_list_each_project() {
        let projects = text( Page::Projects );
        assert!( projects.contains( "E-commerce Platform" ) );
        assert!( projects.contains( "Task Manager App" ) );
        assert!( text( Page::Skills ).contains( "• Python" ) );
    }
}
