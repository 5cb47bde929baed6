//! Drives the agent through the real JNI/JVMTI wrappers against an in-process
//! fake VM: hand-built function tables whose entries record calls and track
//! every buffer they hand out.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_void, CString};
use std::os::raw::{c_char, c_uchar};
use std::ptr;

use loaded_classes_agent::env::JavaVm;
use loaded_classes_agent::sys::jni::{self, jclass, jint, JNIInvokeInterface_, JavaVM};
use loaded_classes_agent::sys::jvmti::{self, jvmtiEnv, jvmtiError, jvmtiInterface_1_};
use loaded_classes_agent::{list_loaded_classes, ClassListerAgent};

#[derive(Clone, Copy)]
struct FakeClass {
    signature: Result<Option<&'static str>, jvmtiError>,
    generic: Option<&'static str>,
}

enum Allocation {
    Classes(Box<[jclass]>),
    Text(CString),
}

struct FakeJvm {
    get_env_status: jint,
    requested_versions: Vec<jint>,
    envs_handed_out: usize,
    env: *mut jvmtiEnv,
    disposals: usize,
    loaded_classes_status: jvmtiError,
    loaded_classes_calls: usize,
    classes: Vec<FakeClass>,
    live: HashMap<usize, Allocation>,
    bogus_frees: usize,
}

impl FakeJvm {
    fn with_signatures(signatures: &[&'static str]) -> Self {
        FakeJvm {
            get_env_status: jni::JNI_OK,
            requested_versions: Vec::new(),
            envs_handed_out: 0,
            env: ptr::null_mut(),
            disposals: 0,
            loaded_classes_status: jvmtiError::NONE,
            loaded_classes_calls: 0,
            classes: signatures
                .iter()
                .map(|sig| FakeClass { signature: Ok(Some(*sig)), generic: None })
                .collect(),
            live: HashMap::new(),
            bogus_frees: 0,
        }
    }

    fn track(&mut self, allocation: Allocation) -> *mut c_void {
        let ptr = match &allocation {
            Allocation::Classes(classes) => classes.as_ptr() as *mut c_void,
            Allocation::Text(text) => text.as_ptr() as *mut c_void,
        };
        self.live.insert(ptr as usize, allocation);
        ptr
    }
}

thread_local! {
    static JVM: RefCell<Option<FakeJvm>> = RefCell::new(None);
}

fn with_jvm<R>(f: impl FnOnce(&mut FakeJvm) -> R) -> R {
    JVM.with(|slot| f(slot.borrow_mut().as_mut().expect("fake JVM not installed")))
}

unsafe extern "system" fn fake_get_env(_vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint {
    let (status, env) = with_jvm(|jvm| {
        jvm.requested_versions.push(version);
        if jvm.get_env_status == jni::JNI_OK {
            jvm.envs_handed_out += 1;
        }
        (jvm.get_env_status, jvm.env)
    });
    if status == jni::JNI_OK {
        *penv = env as *mut c_void;
    }
    status
}

unsafe extern "system" fn fake_vm_unused(_vm: *mut JavaVM) -> jint {
    jni::JNI_ERR
}

unsafe extern "system" fn fake_attach_unused(_vm: *mut JavaVM, _penv: *mut *mut c_void, _args: *mut c_void) -> jint {
    jni::JNI_ERR
}

unsafe extern "system" fn fake_get_loaded_classes(
    _env: *mut jvmtiEnv,
    class_count_ptr: *mut jint,
    classes_ptr: *mut *mut jclass,
) -> jvmtiError {
    let result = with_jvm(|jvm| {
        jvm.loaded_classes_calls += 1;
        if jvm.loaded_classes_status != jvmtiError::NONE {
            return Err(jvm.loaded_classes_status);
        }
        let handles: Box<[jclass]> = (1..=jvm.classes.len()).map(|handle| handle as jclass).collect();
        let len = handles.len();
        Ok((len, jvm.track(Allocation::Classes(handles)) as *mut jclass))
    });

    match result {
        Ok((len, ptr)) => {
            *class_count_ptr = len as jint;
            *classes_ptr = ptr;
            jvmtiError::NONE
        }
        Err(err) => err,
    }
}

unsafe extern "system" fn fake_get_class_signature(
    _env: *mut jvmtiEnv,
    klass: jclass,
    signature_ptr: *mut *mut c_char,
    generic_ptr: *mut *mut c_char,
) -> jvmtiError {
    let result = with_jvm(|jvm| -> Result<(*mut c_char, *mut c_char), jvmtiError> {
        let FakeClass { signature, generic } = jvm.classes[klass as usize - 1];
        let signature = signature?;
        let mut text = |s: &str| jvm.track(Allocation::Text(CString::new(s).unwrap())) as *mut c_char;
        let sig = signature.map_or(ptr::null_mut(), &mut text);
        let generic_sig = generic.map_or(ptr::null_mut(), &mut text);
        Ok((sig, generic_sig))
    });

    match result {
        Ok((sig, generic_sig)) => {
            *signature_ptr = sig;
            if !generic_ptr.is_null() {
                *generic_ptr = generic_sig;
            }
            jvmtiError::NONE
        }
        Err(err) => err,
    }
}

unsafe extern "system" fn fake_deallocate(_env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError {
    with_jvm(|jvm| match jvm.live.remove(&(mem as usize)) {
        Some(_) => jvmtiError::NONE,
        None => {
            jvm.bogus_frees += 1;
            jvmtiError::ILLEGAL_ARGUMENT
        }
    })
}

unsafe extern "system" fn fake_dispose_environment(_env: *mut jvmtiEnv) -> jvmtiError {
    with_jvm(|jvm| jvm.disposals += 1);
    jvmtiError::NONE
}

/// Owns the function tables for the lifetime of one test.
struct Fixture {
    _invoke: Box<JNIInvokeInterface_>,
    _functions: Box<jvmtiInterface_1_>,
    _env: Box<jvmtiEnv>,
    vm: Box<JavaVM>,
}

impl Fixture {
    fn install(mut jvm: FakeJvm) -> Fixture {
        let functions = Box::new(jvmtiInterface_1_ {
            Deallocate: Some(fake_deallocate),
            GetClassSignature: Some(fake_get_class_signature),
            GetLoadedClasses: Some(fake_get_loaded_classes),
            DisposeEnvironment: Some(fake_dispose_environment),
            ..Default::default()
        });
        let mut env = Box::new(jvmtiEnv { functions: &*functions });

        let invoke = Box::new(JNIInvokeInterface_ {
            reserved0: ptr::null_mut(),
            reserved1: ptr::null_mut(),
            reserved2: ptr::null_mut(),
            DestroyJavaVM: fake_vm_unused,
            AttachCurrentThread: fake_attach_unused,
            DetachCurrentThread: fake_vm_unused,
            GetEnv: fake_get_env,
            AttachCurrentThreadAsDaemon: fake_attach_unused,
        });
        let vm: Box<JavaVM> = Box::new(&*invoke as JavaVM);

        jvm.env = &mut *env;
        JVM.with(|slot| *slot.borrow_mut() = Some(jvm));

        Fixture { _invoke: invoke, _functions: functions, _env: env, vm }
    }

    fn vm_ptr(&mut self) -> *mut JavaVM {
        &mut *self.vm
    }

    fn attach(&mut self) -> (jint, Vec<String>) {
        let mut out = Vec::new();
        let status = ClassListerAgent.attach_to(self.vm_ptr(), "", &mut out);
        let lines = String::from_utf8(out).unwrap().lines().map(str::to_owned).collect();
        (status, lines)
    }
}

#[test]
fn attach_lists_every_class_and_releases_host_memory() {
    let mut jvm = FakeJvm::with_signatures(&["Ljava/lang/Object;", "Ljava/util/List;", "[Ljava/lang/String;"]);
    jvm.classes[1].generic = Some("<E:Ljava/lang/Object;>Ljava/lang/Object;Ljava/util/Collection<TE;>;");
    let mut fixture = Fixture::install(jvm);

    let (status, lines) = fixture.attach();

    assert_eq!(status, jni::JNI_OK);
    assert_eq!(
        lines,
        vec![
            "Agent OnAttach",
            "class signature = Ljava/lang/Object;",
            "class signature = Ljava/util/List;",
            "class signature = [Ljava/lang/String;",
        ]
    );
    with_jvm(|jvm| {
        assert_eq!(jvm.requested_versions, vec![jvmti::JVMTI_VERSION_1_2]);
        assert!(jvm.live.is_empty(), "{} host buffers leaked", jvm.live.len());
        assert_eq!(jvm.bogus_frees, 0);
        assert_eq!(jvm.disposals, 1);
    });
}

#[test]
fn every_attach_disposes_the_environment_it_acquired() {
    let mut fixture = Fixture::install(FakeJvm::with_signatures(&["Ljava/lang/Object;"]));

    for _ in 0..3 {
        let (status, _) = fixture.attach();
        assert_eq!(status, jni::JNI_OK);
    }
    with_jvm(|jvm| jvm.loaded_classes_status = jvmtiError::WRONG_PHASE);
    let (status, _) = fixture.attach();
    assert_eq!(status, jvmtiError::WRONG_PHASE.as_jint());

    with_jvm(|jvm| {
        assert_eq!(jvm.envs_handed_out, 4);
        assert_eq!(jvm.disposals, jvm.envs_handed_out);
    });
}

#[test]
fn get_env_failure_is_returned_unchanged() {
    let mut jvm = FakeJvm::with_signatures(&["Ljava/lang/Object;"]);
    jvm.get_env_status = jni::JNI_EVERSION;
    let mut fixture = Fixture::install(jvm);

    let (status, lines) = fixture.attach();

    assert_eq!(status, jni::JNI_EVERSION);
    assert_eq!(lines, vec!["Agent OnAttach", "Unable to access jvm env"]);
    with_jvm(|jvm| {
        assert_eq!(jvm.loaded_classes_calls, 0);
        assert_eq!(jvm.disposals, 0);
    });
}

#[test]
fn loaded_classes_failure_is_returned_unchanged() {
    let mut jvm = FakeJvm::with_signatures(&["Ljava/lang/Object;"]);
    jvm.loaded_classes_status = jvmtiError::WRONG_PHASE;
    let mut fixture = Fixture::install(jvm);

    let (status, lines) = fixture.attach();

    assert_eq!(status, jvmtiError::WRONG_PHASE.as_jint());
    assert_eq!(lines, vec!["Agent OnAttach", "JVMTI GetLoadedClasses failed"]);
    with_jvm(|jvm| assert!(jvm.live.is_empty()));
}

#[test]
fn empty_class_list_succeeds_silently() {
    let mut fixture = Fixture::install(FakeJvm::with_signatures(&[]));

    let (status, lines) = fixture.attach();

    assert_eq!(status, jni::JNI_OK);
    assert_eq!(lines, vec!["Agent OnAttach"]);
    with_jvm(|jvm| assert!(jvm.live.is_empty()));
}

#[test]
fn null_and_failed_signatures_are_reported_per_class() {
    let mut jvm = FakeJvm::with_signatures(&["LA;", "LB;", "LC;"]);
    jvm.classes[0].signature = Ok(None);
    jvm.classes[1].signature = Err(jvmtiError::INVALID_CLASS);
    let mut fixture = Fixture::install(jvm);

    let mut out = Vec::new();
    let vm = unsafe { JavaVm::from_raw(fixture.vm_ptr()) }.unwrap();
    let status = list_loaded_classes(&vm, &mut out);

    assert_eq!(status, jni::JNI_OK);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "class signature = <unknown>\n\
         class signature = <unavailable: error 21>\n\
         class signature = LC;\n"
    );
    with_jvm(|jvm| {
        assert!(jvm.live.is_empty());
        assert_eq!(jvm.bogus_frees, 0);
    });
}

#[test]
fn exported_entry_points_forward_status() {
    let mut jvm = FakeJvm::with_signatures(&["Ljava/lang/Object;"]);
    jvm.get_env_status = jni::JNI_EDETACHED;
    let mut fixture = Fixture::install(jvm);
    let options = CString::new("").unwrap();

    unsafe {
        let vm = fixture.vm_ptr();
        assert_eq!(
            loaded_classes_agent::Agent_OnLoad(vm, options.as_ptr() as *mut c_char, ptr::null_mut()),
            jni::JNI_OK
        );
        assert_eq!(
            loaded_classes_agent::Agent_OnAttach(vm, ptr::null_mut(), ptr::null_mut()),
            jni::JNI_EDETACHED
        );
        loaded_classes_agent::Agent_OnUnload(vm);
    }
}
