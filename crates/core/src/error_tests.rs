use super::*;

#[test]
fn not_owned_maps_to_403() {
    assert_eq!(HostError::NotOwned.status_code(), 403);
    assert_eq!(HostError::NotOwned.tag(), "NotOwned");
}

#[test]
fn already_exists_maps_to_409() {
    let e = HostError::AlreadyExists("alpha".into());
    assert_eq!(e.status_code(), 409);
    assert_eq!(e.tag(), "AlreadyExists");
}

#[test]
fn rpc_timeout_maps_to_504() {
    assert_eq!(HostError::RpcTimeout.status_code(), 504);
}
