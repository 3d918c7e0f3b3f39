use std::fmt;

/// Commands and reply-keyboard buttons the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuItem {
  Start,
  Help,
  Graphics2D,
  Graphics3D,
  AddExplicit,
  AddImplicit,
  AddSurface,
  Clear,
  Back,
}

impl MenuItem {
  pub const ALL: [MenuItem; 9] = [
    MenuItem::Start,
    MenuItem::Help,
    MenuItem::Graphics2D,
    MenuItem::Graphics3D,
    MenuItem::AddExplicit,
    MenuItem::AddImplicit,
    MenuItem::AddSurface,
    MenuItem::Clear,
    MenuItem::Back,
  ];

  /// Button text, or the command for items without a button.
  pub fn label(self) -> &'static str {
    match self {
      MenuItem::Start => "/start",
      MenuItem::Help => "Help",
      MenuItem::Graphics2D => "2D Graphics",
      MenuItem::Graphics3D => "3D Graphics",
      MenuItem::AddExplicit => "Add Explicit Function",
      MenuItem::AddImplicit => "Add Implicit Function",
      MenuItem::AddSurface => "Add 3D Function",
      MenuItem::Clear => "Clear",
      MenuItem::Back => "Back",
    }
  }

  /// Exact, case-sensitive match of a label or command.
  pub fn from_label(text: &str) -> Option<Self> {
    match text {
      "/help" => Some(MenuItem::Help),
      _ => MenuItem::ALL.into_iter().find(|item| item.label() == text),
    }
  }
}

impl fmt::Display for MenuItem {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Rows of buttons shown under a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
  pub rows: Vec<Vec<MenuItem>>,
}

impl Keyboard {
  pub fn main() -> Self {
    Keyboard {
      rows: vec![
        vec![MenuItem::Graphics2D, MenuItem::Graphics3D],
        vec![MenuItem::Help],
      ],
    }
  }

  pub fn graphics_2d() -> Self {
    Keyboard {
      rows: vec![
        vec![MenuItem::AddExplicit, MenuItem::AddImplicit],
        vec![MenuItem::Clear, MenuItem::Back],
      ],
    }
  }

  pub fn graphics_3d() -> Self {
    Keyboard {
      rows: vec![vec![MenuItem::AddSurface], vec![MenuItem::Back]],
    }
  }

  pub fn contains(&self, item: MenuItem) -> bool {
    self.rows.iter().flatten().any(|&i| i == item)
  }
}

impl fmt::Display for Keyboard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (idx, row) in self.rows.iter().enumerate() {
      if idx > 0 {
        writeln!(f)?;
      }
      let buttons: Vec<String> =
        row.iter().map(|item| format!("[{item}]")).collect();
      write!(f, "{}", buttons.join(" "))?;
    }
    Ok(())
  }
}
