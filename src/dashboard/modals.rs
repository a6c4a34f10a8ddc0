use crate::model::{Profile, Role, UserRecord};

use super::Loaded;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserModalMode {
    Create,
    Edit,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserDraft {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Create/edit user form. The draft survives a failed submit.
#[derive(Clone, Debug)]
pub struct UserModal {
    open: bool,
    mode: UserModalMode,
    pub draft: UserDraft,
}

impl Default for UserModal {
    fn default() -> Self {
        Self {
            open: false,
            mode: UserModalMode::Create,
            draft: UserDraft::default(),
        }
    }
}

impl UserModal {
    pub fn open_create(&mut self) {
        self.open = true;
        self.mode = UserModalMode::Create;
        self.draft = UserDraft::default();
    }

    pub fn open_edit(&mut self, user: &UserRecord) {
        self.open = true;
        self.mode = UserModalMode::Edit;
        self.draft = UserDraft {
            username: user.username.clone(),
            password: String::new(),
            role: Role::parse(&user.role),
        };
    }

    pub fn close(&mut self) {
        self.open = false;
        self.draft = UserDraft::default();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> UserModalMode {
        self.mode
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.open {
            return Err("user form is not open".to_string());
        }
        if self.draft.username.trim().is_empty() {
            return Err("Username is required".to_string());
        }
        if self.mode == UserModalMode::Create && self.draft.password.is_empty() {
            return Err("Password is required".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PasswordModal {
    open: bool,
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordModal {
    pub fn open(&mut self) {
        *self = Self {
            open: true,
            ..Default::default()
        };
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.open {
            return Err("password form is not open".to_string());
        }
        if self.old_password.is_empty() || self.new_password.is_empty() {
            return Err("Please fill in all password fields".to_string());
        }
        if self.new_password != self.confirm_password {
            return Err("New passwords do not match".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileModal {
    open: bool,
    pub profile: Loaded<Profile>,
}

impl ProfileModal {
    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}
