//! In-process stand-ins for the hosted store and identity service.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, Credentials, NewApplication, Registration, Role, Stage,
    UserAccount, UserId,
};
use super::fees::FeeDetails;
use super::profile::StudentProfile;
use super::store::{
    ApplicationStore, AuthError, AuthListener, IdentityProvider, ProfileStore, StoreError,
    Subscription,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Default, Clone)]
pub struct InMemoryApplicationStore {
    records: Arc<Mutex<HashMap<ApplicationId, Application>>>,
    profiles: Arc<Mutex<HashMap<UserId, StudentProfile>>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryApplicationStore {
    /// Seed the store with already-identified applications.
    pub fn with_applications(applications: impl IntoIterator<Item = Application>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.records.lock().expect("store mutex poisoned");
            for application in applications {
                guard.insert(application.id.clone(), application);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_id(&self) -> ApplicationId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        ApplicationId(format!("app-{id:06}"))
    }

    fn modify<F>(&self, id: &ApplicationId, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Application),
    {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        change(record);
        Ok(())
    }
}

impl ProfileStore for InMemoryApplicationStore {
    fn fetch_profile(&self, student: &UserId) -> Result<Option<StudentProfile>, StoreError> {
        let guard = self.profiles.lock().expect("profile mutex poisoned");
        Ok(guard.get(student).cloned())
    }

    fn save_profile(&self, profile: &StudentProfile) -> Result<(), StoreError> {
        self.profiles
            .lock()
            .expect("profile mutex poisoned")
            .insert(profile.student_id.clone(), profile.clone());
        Ok(())
    }
}

impl ApplicationStore for InMemoryApplicationStore {
    fn fetch_applications_by_college(
        &self,
        college: &str,
    ) -> Result<Vec<Application>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        let mut matches: Vec<Application> = guard
            .values()
            .filter(|record| record.course.college_name == college)
            .cloned()
            .collect();
        matches.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(matches)
    }

    fn fetch_applications_by_student(
        &self,
        student: &UserId,
    ) -> Result<Vec<Application>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        let mut matches: Vec<Application> = guard
            .values()
            .filter(|record| &record.student_id == student)
            .cloned()
            .collect();
        matches.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(matches)
    }

    fn fetch_application_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn create_application(&self, application: NewApplication) -> Result<ApplicationId, StoreError> {
        let id = self.next_id();
        let record = Application::from_new(id.clone(), application);
        self.records
            .lock()
            .expect("store mutex poisoned")
            .insert(id.clone(), record);
        Ok(id)
    }

    fn update_application_stage(
        &self,
        id: &ApplicationId,
        stage: Stage,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.modify(id, |record| {
            record.stage = stage;
            record.last_updated = at;
        })
    }

    fn update_application_status(
        &self,
        id: &ApplicationId,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.modify(id, |record| {
            record.status = status.to_string();
            record.last_updated = at;
        })
    }

    fn save_fee_details(
        &self,
        id: &ApplicationId,
        fees: &FeeDetails,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.modify(id, |record| {
            record.fee_details = Some(fees.clone());
            record.last_updated = at;
        })
    }
}

struct Account {
    user: UserAccount,
    password: String,
}

#[derive(Default)]
struct IdentityState {
    accounts: HashMap<String, Account>,
    current: Option<UserAccount>,
    listeners: BTreeMap<Subscription, AuthListener>,
}

/// Single-session identity provider mirroring a browser tab's auth state.
#[derive(Default, Clone)]
pub struct InMemoryIdentityProvider {
    state: Arc<Mutex<IdentityState>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryIdentityProvider {
    /// Register an account without signing it in.
    pub fn register(&self, registration: Registration) -> Result<UserAccount, AuthError> {
        validate_registration(&registration)?;

        let mut state = self.state.lock().expect("identity mutex poisoned");
        let email = normalize_email(&registration.email);
        if state.accounts.contains_key(&email) {
            return Err(AuthError::EmailInUse(email));
        }

        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let user = UserAccount {
            id: UserId(format!("user-{id:04}")),
            email: email.clone(),
            role: registration.role,
            college: registration.college.map(|college| college.trim().to_string()),
        };
        state.accounts.insert(
            email,
            Account {
                user: user.clone(),
                password: registration.password,
            },
        );
        Ok(user)
    }

    fn set_current(&self, user: Option<UserAccount>) {
        let listeners: Vec<AuthListener> = {
            let mut state = self.state.lock().expect("identity mutex poisoned");
            state.current = user.clone();
            state.listeners.values().cloned().collect()
        };

        // notified outside the lock so listeners may call back into the provider
        for listener in listeners {
            listener(user.as_ref());
        }
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn current_user(&self) -> Option<UserAccount> {
        self.state
            .lock()
            .expect("identity mutex poisoned")
            .current
            .clone()
    }

    fn on_auth_state_changed(&self, listener: AuthListener) -> Subscription {
        let subscription = Subscription(self.sequence.fetch_add(1, Ordering::Relaxed) + 1);
        let current = {
            let mut state = self.state.lock().expect("identity mutex poisoned");
            state.listeners.insert(subscription, listener.clone());
            state.current.clone()
        };
        listener(current.as_ref());
        subscription
    }

    fn unsubscribe(&self, subscription: Subscription) {
        self.state
            .lock()
            .expect("identity mutex poisoned")
            .listeners
            .remove(&subscription);
    }

    fn sign_in(&self, credentials: &Credentials) -> Result<UserAccount, AuthError> {
        let user = {
            let state = self.state.lock().expect("identity mutex poisoned");
            let account = state
                .accounts
                .get(&normalize_email(&credentials.email))
                .filter(|account| account.password == credentials.password)
                .ok_or(AuthError::InvalidCredentials)?;
            if account.user.role != credentials.role {
                return Err(AuthError::RoleMismatch(credentials.role));
            }
            account.user.clone()
        };

        self.set_current(Some(user.clone()));
        Ok(user)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        self.set_current(None);
        Ok(())
    }

    fn sign_up(&self, registration: Registration) -> Result<UserAccount, AuthError> {
        let user = self.register(registration)?;
        self.set_current(Some(user.clone()));
        Ok(user)
    }
}

fn validate_registration(registration: &Registration) -> Result<(), AuthError> {
    if registration.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
    }

    let has_college = registration
        .college
        .as_deref()
        .is_some_and(|college| !college.trim().is_empty());
    if registration.role == Role::Admin && !has_college {
        return Err(AuthError::MissingCollege);
    }

    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
