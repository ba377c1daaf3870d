use bytes::{BufMut, BytesMut};

#[allow(clippy::len_without_is_empty)]
pub trait TlvEmitter {
    fn typ(&self) -> u8;
    fn len(&self) -> u8;
    fn emit(&self, buf: &mut BytesMut);

    fn tlv_emit(&self, buf: &mut BytesMut) {
        buf.put_u8(self.typ());
        buf.put_u8(self.len());
        self.emit(buf);
    }
}
